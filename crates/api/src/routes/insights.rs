//! KPI endpoints: summary, daily time series and period comparison.

use axum::{extract::State, Json};
use dashboard_core::{aggregate, aggregate_daily, compare, distinct_entities, filter_records};
use dashboard_core::Comparison;
use std::time::Instant;
use telemetry::metrics;
use tracing::debug;

use crate::extractors::InsightsParams;
use crate::response::{ApiError, SummaryResponse, TimeseriesResponse};
use crate::state::AppState;

/// GET /insights/summary - Totals and ratios over the window.
pub async fn summary_handler(
    State(state): State<AppState>,
    InsightsParams(query): InsightsParams,
) -> Result<Json<SummaryResponse>, ApiError> {
    let start = Instant::now();
    metrics().aggregate_requests.inc();

    let window = query.window(state.today())?;
    let scope = query.scope(&state).await?;
    let records = state
        .fetch_records(&window, scope.entity_ids.as_deref())
        .await?;

    let result = aggregate(records.iter(), &window, &scope.group);
    let entity_count = distinct_entities(records.iter(), &window, &scope.group);
    let record_count = filter_records(records.iter(), &window, &scope.group).count();

    debug!(
        window = %window,
        records = record_count,
        duration_ms = start.elapsed().as_millis() as u64,
        "Summary computed"
    );

    Ok(Json(SummaryResponse {
        result,
        entity_count,
        record_count,
    }))
}

/// GET /insights/timeseries - One point per day, zero-filled.
pub async fn timeseries_handler(
    State(state): State<AppState>,
    InsightsParams(query): InsightsParams,
) -> Result<Json<TimeseriesResponse>, ApiError> {
    metrics().aggregate_requests.inc();

    let window = query.window(state.today())?;
    let scope = query.scope(&state).await?;
    let records = state
        .fetch_records(&window, scope.entity_ids.as_deref())
        .await?;

    let points = aggregate_daily(records.iter(), &window, &scope.group);

    Ok(Json(TimeseriesResponse {
        window,
        group: scope.group,
        points,
    }))
}

/// GET /insights/compare - Window against `prev_start..prev_end`, or the
/// equally long period right before it.
pub async fn compare_handler(
    State(state): State<AppState>,
    InsightsParams(query): InsightsParams,
) -> Result<Json<Comparison>, ApiError> {
    metrics().aggregate_requests.inc();

    let current = query.window(state.today())?;
    let previous = match query.previous_window()? {
        Some(previous) => previous,
        None => current.preceding()?,
    };
    let scope = query.scope(&state).await?;

    // Separate fetches: the windows may be far apart.
    let mut records = state
        .fetch_records(&current, scope.entity_ids.as_deref())
        .await?
        .to_vec();
    records.extend(
        state
            .fetch_records(&previous, scope.entity_ids.as_deref())
            .await?
            .iter()
            .cloned(),
    );

    let comparison = compare(&records, &current, &previous, &scope.group)?;
    Ok(Json(comparison))
}
