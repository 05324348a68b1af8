//! Core types, validation and KPI aggregation for the ads dashboard.

pub mod aggregate;
pub mod campaign;
pub mod error;
pub mod limits;
pub mod record;
pub mod window;

pub use aggregate::*;
pub use campaign::*;
pub use error::{Error, Result};
pub use record::*;
pub use window::*;
