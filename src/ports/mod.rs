//! Port traits at the storage and configuration seams.

pub mod account_store;
pub mod config_port;
pub mod trade_store;
