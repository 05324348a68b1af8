//! On-demand sync triggers.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::info;
use worker::SyncWorker;

use crate::extractors::InsightsParams;
use crate::response::{ApiError, CampaignSyncResponse, SyncResponse};
use crate::state::AppState;

fn sync_worker(state: &AppState) -> Result<&Arc<SyncWorker>, ApiError> {
    state
        .sync
        .as_ref()
        .ok_or_else(|| ApiError::unavailable("Meta API is not configured"))
}

/// POST /sync - Run one full sync cycle now.
pub async fn sync_handler(State(state): State<AppState>) -> Result<Json<SyncResponse>, ApiError> {
    let worker = sync_worker(&state)?;
    let run = worker.run_once().await?;
    state.records.invalidate_all().await;

    info!(run_id = %run.run_id, records = run.records, "Manual sync finished");
    Ok(Json(SyncResponse::from(run)))
}

/// POST /campaigns/{id}/sync - Re-sync one campaign over the requested
/// window (last 30 days by default).
pub async fn campaign_sync_handler(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
    InsightsParams(query): InsightsParams,
) -> Result<Json<CampaignSyncResponse>, ApiError> {
    let worker = sync_worker(&state)?;
    let window = query.window(state.today())?;
    let records = worker.sync_campaign(&campaign_id, &window).await?;
    state.records.invalidate_all().await;

    Ok(Json(CampaignSyncResponse {
        campaign_id,
        window,
        records,
    }))
}
