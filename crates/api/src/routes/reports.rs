//! Report downloads.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use telemetry::metrics;
use tracing::info;

use crate::export::{report_rows, to_csv, to_xlsx, ReportRow};
use crate::extractors::{InsightsParams, InsightsQuery};
use crate::response::ApiError;
use crate::state::AppState;

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

async fn load_rows(
    state: &AppState,
    query: &InsightsQuery,
) -> Result<(String, Vec<ReportRow>), ApiError> {
    let window = query.window(state.today())?;
    let scope = query.scope(state).await?;
    let records = state
        .fetch_records(&window, scope.entity_ids.as_deref())
        .await?;

    let rows = report_rows(&records, &window, &scope.group);
    if rows.is_empty() {
        return Err(ApiError::not_found(format!("no data in {}", window)));
    }

    let stem = format!(
        "report_{}_{}",
        window.start().format("%Y%m%d"),
        window.end().format("%Y%m%d")
    );
    Ok((stem, rows))
}

fn attachment(content_type: &'static str, filename: String, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

/// GET /reports/export/csv
pub async fn csv_handler(
    State(state): State<AppState>,
    InsightsParams(query): InsightsParams,
) -> Result<Response, ApiError> {
    let (stem, rows) = load_rows(&state, &query).await?;
    let body = to_csv(&rows)?;

    metrics().exports_generated.inc();
    info!(rows = rows.len(), bytes = body.len(), "CSV export generated");
    Ok(attachment(CSV_CONTENT_TYPE, format!("{}.csv", stem), body))
}

/// GET /reports/export/xlsx
pub async fn xlsx_handler(
    State(state): State<AppState>,
    InsightsParams(query): InsightsParams,
) -> Result<Response, ApiError> {
    let (stem, rows) = load_rows(&state, &query).await?;
    let body = to_xlsx(&rows)?;

    metrics().exports_generated.inc();
    info!(rows = rows.len(), bytes = body.len(), "XLSX export generated");
    Ok(attachment(XLSX_CONTENT_TYPE, format!("{}.xlsx", stem), body))
}
