//! HTTP API layer for the ads dashboard.

pub mod export;
pub mod extractors;
pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
