//! Application services. Each one owns its store port behind an `Arc` and
//! is cheap to clone into request handlers.

pub mod accounts;
pub mod journal;

use chrono::{DateTime, Utc};

/// Source of "now", swappable in tests.
pub type Clock = fn() -> DateTime<Utc>;

pub use accounts::AccountService;
pub use journal::TradeJournal;
