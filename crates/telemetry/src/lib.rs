//! Internal telemetry for the ads dashboard.
//!
//! Counters and latencies are kept in memory and periodically flushed to
//! the `internal_metrics` ClickHouse table.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
