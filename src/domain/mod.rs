//! Core domain types and pure logic. Nothing in here touches storage or HTTP.

pub mod account;
pub mod error;
pub mod portfolio;
pub mod query;
pub mod stats;
pub mod trade;
