//! Read queries. Replacing tables are read with `FINAL` so a re-synced
//! day is never counted twice.

use std::time::Instant;

use dashboard_core::{
    AdAccount, Campaign, CampaignStatus, DailyMetricRecord, DateWindow, Result, SyncRun,
};
use telemetry::metrics;

use crate::client::{store_error, ClickHouseClient};
use crate::rows::{AdAccountRow, CampaignIdRow, CampaignRow, DailyMetricRow, SyncRunRow};

const DAILY_COLUMNS: &str = "entity_id, date, impressions, clicks, spend, conversions, conversion_value, reach, frequency, synced_at";
const CAMPAIGN_COLUMNS: &str = "campaign_id, account_id, name, status, objective, daily_budget, lifetime_budget, created_time, synced_at";
const ACCOUNT_COLUMNS: &str = "account_id, name, currency, timezone_name, account_status, amount_spent, balance, synced_at";
const SYNC_RUN_COLUMNS: &str = "run_id, started_at, finished_at, accounts, campaigns, records, failed_campaigns, error";

fn day_param(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Daily records inside `window`, optionally restricted to `entity_ids`.
///
/// An empty id list matches nothing.
pub async fn fetch_daily_metrics(
    client: &ClickHouseClient,
    window: &DateWindow,
    entity_ids: Option<&[String]>,
) -> Result<Vec<DailyMetricRecord>> {
    if matches!(entity_ids, Some(ids) if ids.is_empty()) {
        return Ok(Vec::new());
    }

    let start = Instant::now();
    let mut sql = format!(
        "SELECT {} FROM daily_metrics FINAL WHERE date BETWEEN toDate(?) AND toDate(?)",
        DAILY_COLUMNS
    );
    if entity_ids.is_some() {
        sql.push_str(" AND has(?, entity_id)");
    }
    sql.push_str(" ORDER BY entity_id, date");

    let mut query = client
        .inner()
        .query(&sql)
        .bind(day_param(window.start()))
        .bind(day_param(window.end()));
    if let Some(ids) = entity_ids {
        query = query.bind(ids);
    }

    let rows: Vec<DailyMetricRow> = query
        .fetch_all()
        .await
        .map_err(|e| store_error("fetch daily_metrics", e))?;

    metrics().store_reads.inc();
    metrics().store_latency_ms.observe_since(start);

    Ok(rows.into_iter().map(DailyMetricRow::into_record).collect())
}

pub async fn list_campaigns(
    client: &ClickHouseClient,
    account_id: Option<&str>,
    status: Option<CampaignStatus>,
) -> Result<Vec<Campaign>> {
    let mut sql = format!("SELECT {} FROM campaigns FINAL WHERE 1 = 1", CAMPAIGN_COLUMNS);
    if account_id.is_some() {
        sql.push_str(" AND account_id = ?");
    }
    if status.is_some() {
        sql.push_str(" AND status = ?");
    }
    sql.push_str(" ORDER BY name, campaign_id");

    let mut query = client.inner().query(&sql);
    if let Some(account) = account_id {
        query = query.bind(account);
    }
    if let Some(status) = status {
        query = query.bind(status.as_str());
    }

    let rows: Vec<CampaignRow> = query
        .fetch_all()
        .await
        .map_err(|e| store_error("list campaigns", e))?;
    metrics().store_reads.inc();

    Ok(rows.into_iter().map(CampaignRow::into_campaign).collect())
}

pub async fn get_campaign(client: &ClickHouseClient, campaign_id: &str) -> Result<Option<Campaign>> {
    let sql = format!(
        "SELECT {} FROM campaigns FINAL WHERE campaign_id = ? LIMIT 1",
        CAMPAIGN_COLUMNS
    );
    let row: Option<CampaignRow> = client
        .inner()
        .query(&sql)
        .bind(campaign_id)
        .fetch_optional()
        .await
        .map_err(|e| store_error("get campaign", e))?;
    metrics().store_reads.inc();

    Ok(row.map(CampaignRow::into_campaign))
}

pub async fn list_ad_accounts(client: &ClickHouseClient) -> Result<Vec<AdAccount>> {
    let sql = format!("SELECT {} FROM ad_accounts FINAL ORDER BY name", ACCOUNT_COLUMNS);
    let rows: Vec<AdAccountRow> = client
        .inner()
        .query(&sql)
        .fetch_all()
        .await
        .map_err(|e| store_error("list ad_accounts", e))?;
    metrics().store_reads.inc();

    Ok(rows.into_iter().map(AdAccountRow::into_account).collect())
}

/// Ids of every campaign belonging to `account_id`.
pub async fn campaign_ids_for_account(
    client: &ClickHouseClient,
    account_id: &str,
) -> Result<Vec<String>> {
    let rows: Vec<CampaignIdRow> = client
        .inner()
        .query("SELECT campaign_id FROM campaigns FINAL WHERE account_id = ? ORDER BY campaign_id")
        .bind(account_id)
        .fetch_all()
        .await
        .map_err(|e| store_error("campaign ids", e))?;
    metrics().store_reads.inc();
    Ok(rows.into_iter().map(|r| r.campaign_id).collect())
}

pub async fn last_sync_run(client: &ClickHouseClient) -> Result<Option<SyncRun>> {
    let sql = format!(
        "SELECT {} FROM sync_runs ORDER BY started_at DESC LIMIT 1",
        SYNC_RUN_COLUMNS
    );
    let row: Option<SyncRunRow> = client
        .inner()
        .query(&sql)
        .fetch_optional()
        .await
        .map_err(|e| store_error("last sync run", e))?;
    Ok(row.map(SyncRunRow::into_sync_run))
}
