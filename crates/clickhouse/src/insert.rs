//! Batch insert helpers for ClickHouse.

use std::time::Instant;

use chrono::{DateTime, Utc};
use clickhouse::Row;
use dashboard_core::{AdAccount, Campaign, DailyMetricRecord, Result, SyncRun};
use serde::Serialize;
use telemetry::{metrics, MetricsSnapshot};
use tracing::debug;

use crate::client::{store_error, ClickHouseClient};
use crate::rows::{AdAccountRow, CampaignRow, DailyMetricRow, MetricsRow, SyncRunRow};

/// Writes `rows` to `table` in a single INSERT.
async fn insert_rows<T: Row + Serialize + Send + Sync>(
    client: &ClickHouseClient,
    table: &str,
    rows: &[T],
) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let start = Instant::now();

    let mut insert = client
        .inner()
        .insert::<T>(table)
        .map_err(|e| store_error("insert", e))?;

    for row in rows {
        insert
            .write(row)
            .await
            .map_err(|e| store_error("write", e))?;
    }

    insert.end().await.map_err(|e| store_error("end", e))?;

    metrics().store_latency_ms.observe_since(start);
    metrics().store_writes.inc();

    debug!(
        table = table,
        count = rows.len(),
        latency_ms = %start.elapsed().as_millis(),
        "Inserted rows to ClickHouse"
    );

    Ok(rows.len())
}

/// Inserts daily records. Rows with the same `(entity_id, date)` replace
/// older ones on merge; the newest `synced_at` wins.
pub async fn insert_daily_metrics(
    client: &ClickHouseClient,
    records: &[DailyMetricRecord],
    synced_at: DateTime<Utc>,
) -> Result<usize> {
    let rows = records
        .iter()
        .map(|r| DailyMetricRow::from_record(r, synced_at))
        .collect::<Result<Vec<_>>>()?;
    insert_rows(client, "daily_metrics", &rows).await
}

pub async fn insert_campaigns(
    client: &ClickHouseClient,
    campaigns: &[Campaign],
    synced_at: DateTime<Utc>,
) -> Result<usize> {
    let rows = campaigns
        .iter()
        .map(|c| CampaignRow::from_campaign(c, synced_at))
        .collect::<Result<Vec<_>>>()?;
    insert_rows(client, "campaigns", &rows).await
}

pub async fn insert_ad_accounts(
    client: &ClickHouseClient,
    accounts: &[AdAccount],
    synced_at: DateTime<Utc>,
) -> Result<usize> {
    let rows = accounts
        .iter()
        .map(|a| AdAccountRow::from_account(a, synced_at))
        .collect::<Result<Vec<_>>>()?;
    insert_rows(client, "ad_accounts", &rows).await
}

pub async fn insert_sync_run(client: &ClickHouseClient, run: &SyncRun) -> Result<()> {
    insert_rows(client, "sync_runs", &[SyncRunRow::from(run)]).await?;
    Ok(())
}

/// Insert internal metrics snapshot.
pub async fn insert_metrics(client: &ClickHouseClient, snapshot: MetricsSnapshot) -> Result<()> {
    insert_rows(client, "internal_metrics", &[MetricsRow::from(snapshot)]).await?;
    Ok(())
}
