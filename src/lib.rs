//! tradejournal: a personal crypto trade journal served as a JSON API.
//!
//! Hexagonal architecture: domain types and pure logic in [`domain`], port
//! traits in [`ports`], application services in [`services`], concrete
//! implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
pub mod services;
