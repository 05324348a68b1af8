//! Meta Marketing API client for the ads dashboard.

pub mod client;
pub mod config;
pub mod health;
pub mod ids;
pub mod source;
pub mod types;

pub use client::*;
pub use config::*;
pub use source::*;
