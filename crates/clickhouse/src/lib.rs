//! ClickHouse storage for the ads dashboard.

pub mod client;
pub mod config;
pub mod health;
pub mod insert;
pub mod query;
pub mod rows;
pub mod schema;
pub mod store;

pub use client::*;
pub use config::*;
pub use query::*;
pub use store::*;
