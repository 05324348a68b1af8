//! Campaign and ad account listings.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use dashboard_core::{
    aggregate, date_from_epoch_day, AdAccount, AggregateResult, Campaign, CampaignStatus,
    DateWindow, GroupBy,
};
use serde::{Deserialize, Serialize};

use crate::response::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CampaignFilter {
    pub account_id: Option<String>,
    pub status: Option<String>,
}

/// A campaign with its aggregate over all stored days.
#[derive(Debug, Serialize, Deserialize)]
pub struct CampaignDetail {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub lifetime: AggregateResult,
}

/// GET /campaigns - Optionally filtered by account and status.
pub async fn list_campaigns_handler(
    State(state): State<AppState>,
    Query(filter): Query<CampaignFilter>,
) -> Result<Json<Vec<Campaign>>, ApiError> {
    let status = filter
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(CampaignStatus::parse);
    if status == Some(CampaignStatus::Unknown) {
        return Err(ApiError::bad_request(format!(
            "unknown campaign status '{}'",
            filter.status.unwrap_or_default()
        )));
    }

    let campaigns = state
        .store
        .list_campaigns(filter.account_id.as_deref(), status)
        .await?;
    Ok(Json(campaigns))
}

/// GET /campaigns/{id}
pub async fn get_campaign_handler(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> Result<Json<CampaignDetail>, ApiError> {
    let campaign = state
        .store
        .get_campaign(&campaign_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("campaign {} not found", campaign_id)))?;

    let lifetime = DateWindow::new(date_from_epoch_day(0), state.today())?;
    let ids = [campaign_id.clone()];
    let records = state.fetch_records(&lifetime, Some(&ids[..])).await?;
    let lifetime = aggregate(records.iter(), &lifetime, &GroupBy::entity(campaign_id));

    Ok(Json(CampaignDetail { campaign, lifetime }))
}

/// GET /accounts
pub async fn list_accounts_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<AdAccount>>, ApiError> {
    Ok(Json(state.store.list_accounts().await?))
}
