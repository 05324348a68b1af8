//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use telemetry::health;
use tracing::warn;

use crate::response::HealthResponse;
use crate::state::AppState;

/// GET /health - Component status and the last sync.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let last_sync_run = match state.store.last_sync_run().await {
        Ok(run) => run,
        Err(e) => {
            warn!("Failed to read last sync run: {}", e);
            None
        }
    };

    Json(HealthResponse {
        report: health().report(),
        last_sync_run,
    })
}

/// GET /health/ready - Readiness probe (can answer dashboard queries).
pub async fn ready_handler() -> StatusCode {
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
