//! Graph API wire types and their conversion into dashboard types.
//!
//! The Graph API returns every number as a string. Conversion goes through
//! [`RawDailyMetrics`] so malformed or negative values are rejected by the
//! same validation as any other record.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use dashboard_core::{
    AdAccount, Campaign, CampaignStatus, DailyMetricRecord, Error, RawDailyMetrics, Result,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::ids::strip_account_prefix;

/// Action types counted as conversions.
pub const CONVERSION_ACTIONS: &[&str] = &["lead", "purchase"];

/// Action type whose value is the conversion value.
pub const VALUE_ACTION: &str = "purchase";

/// One page of a list endpoint.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
pub struct Paging {
    /// Absolute URL of the next page, absent on the last page
    #[serde(default)]
    pub next: Option<String>,
}

/// `{"error": {...}}` body returned on failure.
#[derive(Debug, Deserialize)]
pub struct GraphErrorEnvelope {
    pub error: GraphError,
}

#[derive(Debug, Deserialize)]
pub struct GraphError {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub error_subcode: Option<i64>,
    #[serde(default)]
    pub fbtrace_id: Option<String>,
}

/// `{"action_type": "...", "value": "..."}` entries of insight lists.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionValue {
    pub action_type: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct AccountNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub timezone_name: String,
    #[serde(default)]
    pub account_status: i32,
    /// Minor units
    #[serde(default)]
    pub amount_spent: Option<String>,
    /// Minor units
    #[serde(default)]
    pub balance: Option<String>,
}

impl AccountNode {
    pub fn into_account(self) -> Result<AdAccount> {
        let account_id = match self.account_id {
            Some(id) if !id.is_empty() => id,
            _ => strip_account_prefix(&self.id).to_string(),
        };
        Ok(AdAccount {
            account_id,
            name: self.name,
            currency: self.currency,
            timezone_name: self.timezone_name,
            account_status: self.account_status,
            amount_spent: from_minor_units(self.amount_spent.as_deref())?.unwrap_or_default(),
            balance: from_minor_units(self.balance.as_deref())?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CampaignNode {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub status: String,
    /// Minor units
    #[serde(default)]
    pub daily_budget: Option<String>,
    /// Minor units
    #[serde(default)]
    pub lifetime_budget: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
}

impl CampaignNode {
    pub fn into_campaign(self, account_id: &str) -> Result<Campaign> {
        let created_time = self.created_time.as_deref().and_then(|raw| {
            parse_graph_time(raw)
                .map_err(|e| warn!(campaign_id = %self.id, "Ignoring created_time: {}", e))
                .ok()
        });
        Ok(Campaign {
            campaign_id: self.id,
            account_id: strip_account_prefix(account_id).to_string(),
            name: self.name,
            status: CampaignStatus::parse(&self.status),
            objective: self.objective,
            daily_budget: from_minor_units(self.daily_budget.as_deref())?,
            lifetime_budget: from_minor_units(self.lifetime_budget.as_deref())?,
            created_time,
        })
    }
}

/// One day of campaign insights (`time_increment=1`).
#[derive(Debug, Deserialize)]
pub struct InsightNode {
    #[serde(default)]
    pub campaign_id: Option<String>,
    pub date_start: String,
    #[serde(default)]
    pub impressions: Option<String>,
    #[serde(default)]
    pub reach: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub clicks: Option<String>,
    #[serde(default)]
    pub spend: Option<String>,
    #[serde(default)]
    pub actions: Vec<ActionValue>,
    #[serde(default)]
    pub action_values: Vec<ActionValue>,
    #[serde(default)]
    pub conversion_values: Vec<ActionValue>,
}

impl InsightNode {
    /// Flattens the insight into wire-level daily metrics for `campaign_id`.
    pub fn to_raw(&self, campaign_id: &str) -> Result<RawDailyMetrics> {
        let conversions = self
            .actions
            .iter()
            .filter(|a| CONVERSION_ACTIONS.contains(&a.action_type.as_str()))
            .map(|a| parse_count(&a.action_type, Some(&a.value)))
            .sum::<Result<i64>>()?;

        let conversion_value = find_action(&self.action_values, VALUE_ACTION)
            .or_else(|| find_action(&self.conversion_values, VALUE_ACTION))
            .map(|a| a.value.clone())
            .unwrap_or_default();

        Ok(RawDailyMetrics {
            entity_id: self
                .campaign_id
                .clone()
                .unwrap_or_else(|| campaign_id.to_string()),
            date: self.date_start.clone(),
            impressions: parse_count("impressions", self.impressions.as_deref())?,
            clicks: parse_count("clicks", self.clicks.as_deref())?,
            spend: self.spend.clone().unwrap_or_default(),
            conversions,
            conversion_value,
            reach: parse_count("reach", self.reach.as_deref())?,
            frequency: self.frequency.clone().unwrap_or_default(),
        })
    }

    pub fn into_record(self, campaign_id: &str) -> Result<DailyMetricRecord> {
        DailyMetricRecord::from_raw(self.to_raw(campaign_id)?)
    }
}

fn find_action<'a>(values: &'a [ActionValue], action_type: &str) -> Option<&'a ActionValue> {
    values.iter().find(|a| a.action_type == action_type)
}

/// Parses a Graph API count. Fractional attribution counts are truncated.
fn parse_count(field: &str, value: Option<&str>) -> Result<i64> {
    let raw = match value.map(str::trim) {
        None | Some("") => return Ok(0),
        Some(raw) => raw,
    };
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(n);
    }
    Decimal::from_str(raw)
        .ok()
        .and_then(|d| d.trunc().to_i64())
        .ok_or_else(|| Error::validation(format!("{} '{}' is not a count", field, raw)))
}

/// Converts a minor-unit amount string (cents) into major units.
fn from_minor_units(value: Option<&str>) -> Result<Option<Decimal>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => Decimal::from_str(raw)
            .map(|cents| Some(cents / Decimal::ONE_HUNDRED))
            .map_err(|e| Error::validation(format!("amount '{}': {}", raw, e))),
    }
}

/// Graph timestamps look like `2024-01-15T10:30:00+0000`.
fn parse_graph_time(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z").map(|t| t.with_timezone(&Utc))
}
