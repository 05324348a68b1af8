//! Descriptive entities synced alongside the daily metrics.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Delivery status of a campaign as reported by Meta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Active,
    Paused,
    Deleted,
    Archived,
    Unknown,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Paused => "PAUSED",
            Self::Deleted => "DELETED",
            Self::Archived => "ARCHIVED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parses a status string; anything unrecognised is `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Self::Active,
            "PAUSED" => Self::Paused,
            "DELETED" => Self::Deleted,
            "ARCHIVED" => Self::Archived,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An advertising campaign. `campaign_id` is the entity id of its records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Campaign {
    #[validate(length(min = 1, max = 64))]
    pub campaign_id: String,
    /// Owning ad account, without the `act_` prefix
    #[validate(length(min = 1, max = 64))]
    pub account_id: String,
    #[validate(length(max = 400))]
    pub name: String,
    pub status: CampaignStatus,
    pub objective: Option<String>,
    pub daily_budget: Option<Decimal>,
    pub lifetime_budget: Option<Decimal>,
    pub created_time: Option<DateTime<Utc>>,
}

/// An ad account the access token can read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AdAccount {
    /// Account id without the `act_` prefix
    #[validate(length(min = 1, max = 64))]
    pub account_id: String,
    pub name: String,
    pub currency: String,
    pub timezone_name: String,
    /// Meta account status code (1 = active)
    pub account_status: i32,
    /// Lifetime spend in major currency units
    pub amount_spent: Decimal,
    pub balance: Decimal,
}

/// How a sync cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    /// Every campaign synced
    Succeeded,
    /// Some campaigns failed, the rest were stored
    Partial,
    /// Nothing could be synced
    Failed,
}

/// Record of one ingestion cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub accounts: u32,
    pub campaigns: u32,
    pub records: u64,
    pub failed_campaigns: u32,
    /// Fatal error that stopped the cycle, if any
    pub error: Option<String>,
}

impl SyncRun {
    /// Starts a new run record at `started_at`.
    pub fn begin(started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: started_at,
            accounts: 0,
            campaigns: 0,
            records: 0,
            failed_campaigns: 0,
            error: None,
        }
    }

    pub fn outcome(&self) -> SyncOutcome {
        if self.error.is_some() {
            SyncOutcome::Failed
        } else if self.failed_campaigns == 0 {
            SyncOutcome::Succeeded
        } else if self.failed_campaigns >= self.campaigns {
            SyncOutcome::Failed
        } else {
            SyncOutcome::Partial
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
