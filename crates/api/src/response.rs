//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dashboard_core::{AggregateResult, DateWindow, Error, GroupBy, SyncOutcome, SyncRun};
use serde::{Deserialize, Serialize};
use telemetry::HealthReport;

/// `GET /insights/summary`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub result: AggregateResult,
    /// Distinct campaigns with records in the window
    pub entity_count: usize,
    pub record_count: usize,
}

/// `GET /insights/timeseries`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TimeseriesResponse {
    pub window: DateWindow,
    pub group: GroupBy,
    pub points: Vec<AggregateResult>,
}

/// `POST /sync`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncResponse {
    pub outcome: SyncOutcome,
    pub run: SyncRun,
}

impl From<SyncRun> for SyncResponse {
    fn from(run: SyncRun) -> Self {
        Self {
            outcome: run.outcome(),
            run,
        }
    }
}

/// `POST /campaigns/{id}/sync`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CampaignSyncResponse {
    pub campaign_id: String,
    pub window: DateWindow,
    pub records: u64,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    #[serde(flatten)]
    pub report: HealthReport,
    pub last_sync_run: Option<SyncRun>,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error type with service error codes.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "VALID_001", msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::NOT_FOUND, "NOT_FOUND_001", msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::CONFLICT, "CONFLICT_001", msg)
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::SERVICE_UNAVAILABLE, "UPSTREAM_001", msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_001", msg)
    }

    pub fn validation(code: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            response: ErrorResponse::new("Validation failed", code).with_details(errors),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match &err {
            Error::ValidationWithCode { code, message, .. } => {
                ApiError::validation(*code, vec![message.clone()])
            }
            Error::Database { code, message, http_status }
            | Error::Upstream { code, message, http_status } => {
                let status =
                    StatusCode::from_u16(*http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                ApiError::with_code(status, *code, message)
            }
            Error::Validation(msg) => ApiError::bad_request(msg),
            Error::Serialization(e) => ApiError::bad_request(e.to_string()),
            Error::NotFound(msg) => ApiError::not_found(msg),
            Error::Conflict(msg) => ApiError::conflict(msg),
            Error::Export(_) | Error::Internal(_) => ApiError::internal(err.to_string()),
        }
    }
}
