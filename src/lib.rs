//! userdesk: user administration console (library crate).
//!
//! Re-exports public modules for integration tests and external use.

pub mod cache;
pub mod client;
pub mod config;
pub mod constants;
pub mod env;
pub mod mock;
pub mod models;
pub mod output;
pub mod schema;
pub mod search;
pub mod transport;
pub mod view;
