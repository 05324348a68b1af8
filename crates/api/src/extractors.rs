//! Request extractors.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use chrono::NaiveDate;
use dashboard_core::error::ValidationErrorCode;
use dashboard_core::limits::DEFAULT_RANGE_DAYS;
use dashboard_core::{DateWindow, Error, GroupBy, RangePreset, Result};
use serde::Deserialize;

use crate::response::ApiError;
use crate::state::AppState;

/// Window and scope parameters shared by the insights and report routes.
///
/// The window is `start`+`end`, or `preset`, or the last `days` days
/// (30 when nothing is given). `campaign_id` narrows to one campaign,
/// `account_id` to the campaigns of one ad account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InsightsQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub preset: Option<RangePreset>,
    pub days: Option<i64>,
    pub campaign_id: Option<String>,
    pub account_id: Option<String>,
    /// Comparison period start (compare only)
    pub prev_start: Option<String>,
    /// Comparison period end (compare only)
    pub prev_end: Option<String>,
}

/// Which records a request covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub group: GroupBy,
    /// `None` means every entity
    pub entity_ids: Option<Vec<String>>,
}

fn parse_day(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        Error::validation_code(
            ValidationErrorCode::InvalidInput,
            format!("{} must be a YYYY-MM-DD date, got '{}'", field, value),
        )
    })
}

fn explicit_window(
    start_field: &str,
    start: Option<&str>,
    end_field: &str,
    end: Option<&str>,
) -> Result<Option<DateWindow>> {
    match (start, end) {
        (Some(start), Some(end)) => Ok(Some(DateWindow::new(
            parse_day(start_field, start)?,
            parse_day(end_field, end)?,
        )?)),
        (None, None) => Ok(None),
        _ => Err(Error::validation_code(
            ValidationErrorCode::InvalidInput,
            format!("{} and {} must be given together", start_field, end_field),
        )),
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl InsightsQuery {
    /// Resolves the requested window relative to `today`.
    pub fn window(&self, today: NaiveDate) -> Result<DateWindow> {
        let window = match explicit_window(
            "start",
            non_blank(&self.start),
            "end",
            non_blank(&self.end),
        )? {
            Some(window) => window,
            None => match self.preset {
                Some(preset) => DateWindow::from_preset(preset, today)?,
                None => DateWindow::last_days(today, self.days.unwrap_or(DEFAULT_RANGE_DAYS))?,
            },
        };
        window.check_length()?;
        Ok(window)
    }

    /// Explicit comparison window, if both bounds were given.
    pub fn previous_window(&self) -> Result<Option<DateWindow>> {
        let window = explicit_window(
            "prev_start",
            non_blank(&self.prev_start),
            "prev_end",
            non_blank(&self.prev_end),
        )?;
        if let Some(window) = &window {
            window.check_length()?;
        }
        Ok(window)
    }

    /// Resolves the campaign or account filter into a grouping and the
    /// entity ids to fetch.
    pub async fn scope(&self, state: &AppState) -> Result<Scope> {
        if let Some(campaign_id) = non_blank(&self.campaign_id) {
            return Ok(Scope {
                group: GroupBy::entity(campaign_id),
                entity_ids: Some(vec![campaign_id.to_string()]),
            });
        }
        if let Some(account_id) = non_blank(&self.account_id) {
            let ids = state.store.campaign_ids_for_account(account_id).await?;
            return Ok(Scope {
                group: GroupBy::All,
                entity_ids: Some(ids),
            });
        }
        Ok(Scope {
            group: GroupBy::All,
            entity_ids: None,
        })
    }
}

/// Query string extractor that rejects with a coded `VALID_001` error.
#[derive(Debug, Clone)]
pub struct InsightsParams(pub InsightsQuery);

#[async_trait]
impl<S> FromRequestParts<S> for InsightsParams
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let Query(query) = Query::<InsightsQuery>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(InsightsParams(query))
    }
}
