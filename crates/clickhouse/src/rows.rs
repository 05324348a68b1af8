//! Row types and their mapping to dashboard types.
//!
//! RowBinary encodings: `Date` is days since 1970-01-01 as UInt16,
//! `Decimal(18, 2)` is an Int64 count of minor units and `DateTime64(3)`
//! is Int64 epoch milliseconds.

use chrono::{DateTime, Utc};
use clickhouse::Row;
use dashboard_core::{
    date_from_epoch_day, epoch_day, AdAccount, Campaign, CampaignStatus, DailyMetricRecord, Error,
    Result, SyncRun,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use telemetry::MetricsSnapshot;
use uuid::Uuid;

const CURRENCY_SCALE: u32 = 2;
const FREQUENCY_SCALE: u32 = 4;

/// Converts a value to the Int64 backing a `Decimal(18, scale)` column.
fn to_scaled(value: Decimal, scale: u32) -> Result<i64> {
    value
        .checked_mul(Decimal::from(10_i64.pow(scale)))
        .and_then(|scaled| scaled.round().to_i64())
        .ok_or_else(|| {
            Error::validation(format!("value {} does not fit Decimal(18, {})", value, scale))
        })
}

/// Converts an amount to minor units for a `Decimal(18, 2)` column.
pub fn to_minor(amount: Decimal) -> Result<i64> {
    to_scaled(amount, CURRENCY_SCALE)
}

pub fn from_minor(minor: i64) -> Decimal {
    Decimal::new(minor, CURRENCY_SCALE)
}

fn to_day_number(record: &DailyMetricRecord) -> Result<u16> {
    u16::try_from(epoch_day(record.date))
        .map_err(|_| Error::validation(format!("date {} is outside the Date range", record.date)))
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct DailyMetricRow {
    pub entity_id: String,
    pub date: u16,
    pub impressions: u64,
    pub clicks: u64,
    pub spend: i64,
    pub conversions: u64,
    pub conversion_value: i64,
    pub reach: u64,
    /// `Decimal(18, 4)`
    pub frequency: i64,
    pub synced_at: i64,
}

impl DailyMetricRow {
    pub fn from_record(record: &DailyMetricRecord, synced_at: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            entity_id: record.entity_id.clone(),
            date: to_day_number(record)?,
            impressions: record.impressions,
            clicks: record.clicks,
            spend: to_minor(record.spend)?,
            conversions: record.conversions,
            conversion_value: to_minor(record.conversion_value)?,
            reach: record.reach,
            frequency: to_scaled(record.frequency, FREQUENCY_SCALE)?,
            synced_at: synced_at.timestamp_millis(),
        })
    }

    /// Rows were validated before insert, so they convert without checks.
    pub fn into_record(self) -> DailyMetricRecord {
        DailyMetricRecord {
            entity_id: self.entity_id,
            date: date_from_epoch_day(self.date),
            impressions: self.impressions,
            clicks: self.clicks,
            spend: from_minor(self.spend),
            conversions: self.conversions,
            conversion_value: from_minor(self.conversion_value),
            reach: self.reach,
            frequency: Decimal::new(self.frequency, FREQUENCY_SCALE),
        }
    }
}

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct CampaignRow {
    pub campaign_id: String,
    pub account_id: String,
    pub name: String,
    pub status: String,
    pub objective: Option<String>,
    pub daily_budget: Option<i64>,
    pub lifetime_budget: Option<i64>,
    pub created_time: Option<i64>,
    pub synced_at: i64,
}

impl CampaignRow {
    pub fn from_campaign(campaign: &Campaign, synced_at: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            campaign_id: campaign.campaign_id.clone(),
            account_id: campaign.account_id.clone(),
            name: campaign.name.clone(),
            status: campaign.status.as_str().to_string(),
            objective: campaign.objective.clone(),
            daily_budget: campaign.daily_budget.map(to_minor).transpose()?,
            lifetime_budget: campaign.lifetime_budget.map(to_minor).transpose()?,
            created_time: campaign.created_time.map(|t| t.timestamp_millis()),
            synced_at: synced_at.timestamp_millis(),
        })
    }

    pub fn into_campaign(self) -> Campaign {
        Campaign {
            campaign_id: self.campaign_id,
            account_id: self.account_id,
            name: self.name,
            status: CampaignStatus::parse(&self.status),
            objective: self.objective,
            daily_budget: self.daily_budget.map(from_minor),
            lifetime_budget: self.lifetime_budget.map(from_minor),
            created_time: self.created_time.map(from_millis),
        }
    }
}

#[derive(Debug, Clone, Row, Deserialize)]
pub struct CampaignIdRow {
    pub campaign_id: String,
}

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct AdAccountRow {
    pub account_id: String,
    pub name: String,
    pub currency: String,
    pub timezone_name: String,
    pub account_status: i32,
    pub amount_spent: i64,
    pub balance: i64,
    pub synced_at: i64,
}

impl AdAccountRow {
    pub fn from_account(account: &AdAccount, synced_at: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            account_id: account.account_id.clone(),
            name: account.name.clone(),
            currency: account.currency.clone(),
            timezone_name: account.timezone_name.clone(),
            account_status: account.account_status,
            amount_spent: to_minor(account.amount_spent)?,
            balance: to_minor(account.balance)?,
            synced_at: synced_at.timestamp_millis(),
        })
    }

    pub fn into_account(self) -> AdAccount {
        AdAccount {
            account_id: self.account_id,
            name: self.name,
            currency: self.currency,
            timezone_name: self.timezone_name,
            account_status: self.account_status,
            amount_spent: from_minor(self.amount_spent),
            balance: from_minor(self.balance),
        }
    }
}

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct SyncRunRow {
    pub run_id: String,
    pub started_at: i64,
    pub finished_at: i64,
    pub accounts: u32,
    pub campaigns: u32,
    pub records: u64,
    pub failed_campaigns: u32,
    pub error: Option<String>,
}

impl From<&SyncRun> for SyncRunRow {
    fn from(run: &SyncRun) -> Self {
        Self {
            run_id: run.run_id.to_string(),
            started_at: run.started_at.timestamp_millis(),
            finished_at: run.finished_at.timestamp_millis(),
            accounts: run.accounts,
            campaigns: run.campaigns,
            records: run.records,
            failed_campaigns: run.failed_campaigns,
            error: run.error.clone(),
        }
    }
}

impl SyncRunRow {
    pub fn into_sync_run(self) -> SyncRun {
        SyncRun {
            run_id: Uuid::parse_str(&self.run_id).unwrap_or_default(),
            started_at: from_millis(self.started_at),
            finished_at: from_millis(self.finished_at),
            accounts: self.accounts,
            campaigns: self.campaigns,
            records: self.records,
            failed_campaigns: self.failed_campaigns,
            error: self.error,
        }
    }
}

/// Internal metrics row for ClickHouse.
#[derive(Debug, Clone, Row, Serialize)]
pub struct MetricsRow {
    pub timestamp: i64,
    pub sync_runs: u64,
    pub sync_failures: u64,
    pub campaigns_synced: u64,
    pub campaign_sync_errors: u64,
    pub records_synced: u64,
    pub records_rejected: u64,
    pub meta_requests: u64,
    pub meta_request_errors: u64,
    pub store_reads: u64,
    pub store_writes: u64,
    pub store_errors: u64,
    pub aggregate_requests: u64,
    pub exports_generated: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub meta_latency_mean_ms: f64,
    pub store_latency_mean_ms: f64,
    pub sync_duration_mean_ms: f64,
    pub campaigns_tracked: u64,
    pub last_sync_records: u64,
}

impl From<MetricsSnapshot> for MetricsRow {
    fn from(s: MetricsSnapshot) -> Self {
        Self {
            timestamp: s.timestamp.timestamp_millis(),
            sync_runs: s.sync_runs,
            sync_failures: s.sync_failures,
            campaigns_synced: s.campaigns_synced,
            campaign_sync_errors: s.campaign_sync_errors,
            records_synced: s.records_synced,
            records_rejected: s.records_rejected,
            meta_requests: s.meta_requests,
            meta_request_errors: s.meta_request_errors,
            store_reads: s.store_reads,
            store_writes: s.store_writes,
            store_errors: s.store_errors,
            aggregate_requests: s.aggregate_requests,
            exports_generated: s.exports_generated,
            cache_hits: s.cache_hits,
            cache_misses: s.cache_misses,
            meta_latency_mean_ms: s.meta_latency_mean_ms,
            store_latency_mean_ms: s.store_latency_mean_ms,
            sync_duration_mean_ms: s.sync_duration_mean_ms,
            campaigns_tracked: s.campaigns_tracked,
            last_sync_records: s.last_sync_records,
        }
    }
}
