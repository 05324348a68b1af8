//! Shared helpers for the end-to-end API tests.
//!
//! Tests drive the real router through `axum-test` with an in-memory
//! store and a scripted Meta source, so no external services are needed.

pub mod fixtures;
pub mod mocks;
