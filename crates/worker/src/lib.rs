//! Background workers for the ads dashboard.
//!
//! - Sync (Meta Marketing API → ClickHouse)
//! - Internal metrics flush and ClickHouse health probe

pub mod scheduler;
pub mod sync;

pub use scheduler::*;
pub use sync::*;
