//! API routes.

pub mod campaigns;
pub mod health;
pub mod insights;
pub mod reports;
pub mod sync;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/insights/summary", get(insights::summary_handler))
        .route("/insights/timeseries", get(insights::timeseries_handler))
        .route("/insights/compare", get(insights::compare_handler))
        .route("/campaigns", get(campaigns::list_campaigns_handler))
        .route("/campaigns/:campaign_id", get(campaigns::get_campaign_handler))
        .route("/campaigns/:campaign_id/sync", post(sync::campaign_sync_handler))
        .route("/accounts", get(campaigns::list_accounts_handler))
        .route("/sync", post(sync::sync_handler))
        .route("/reports/export/csv", get(reports::csv_handler))
        .route("/reports/export/xlsx", get(reports::xlsx_handler))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}
