//! ClickHouse table schemas.
//!
//! - `Date` for calendar days, `DateTime64(3)` for instants
//! - `Decimal(18, 2)` for currency, carried as Int64 minor units
//! - `ReplacingMergeTree(synced_at)` where a re-sync must overwrite; read with `FINAL`

/// Daily per-campaign counters. One row per `(entity_id, date)` after merges.
pub const CREATE_DAILY_METRICS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS daily_metrics (
    entity_id String,
    date Date,
    impressions UInt64,
    clicks UInt64,
    spend Decimal(18, 2),
    conversions UInt64,
    conversion_value Decimal(18, 2),
    reach UInt64,
    frequency Decimal(18, 4),
    synced_at DateTime64(3)
)
ENGINE = ReplacingMergeTree(synced_at)
PARTITION BY toYYYYMM(date)
ORDER BY (entity_id, date)
SETTINGS index_granularity = 8192
"#;

pub const CREATE_CAMPAIGNS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS campaigns (
    campaign_id String,
    account_id String,
    name String,
    status LowCardinality(String),
    objective Nullable(String),
    daily_budget Nullable(Decimal(18, 2)),
    lifetime_budget Nullable(Decimal(18, 2)),
    created_time Nullable(DateTime64(3)),
    synced_at DateTime64(3)
)
ENGINE = ReplacingMergeTree(synced_at)
ORDER BY campaign_id
"#;

pub const CREATE_AD_ACCOUNTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ad_accounts (
    account_id String,
    name String,
    currency LowCardinality(String),
    timezone_name LowCardinality(String),
    account_status Int32,
    amount_spent Decimal(18, 2),
    balance Decimal(18, 2),
    synced_at DateTime64(3)
)
ENGINE = ReplacingMergeTree(synced_at)
ORDER BY account_id
"#;

/// One row per sync cycle, kept for a year.
pub const CREATE_SYNC_RUNS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sync_runs (
    run_id String,
    started_at DateTime64(3),
    finished_at DateTime64(3),
    accounts UInt32,
    campaigns UInt32,
    records UInt64,
    failed_campaigns UInt32,
    error Nullable(String)
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(started_at)
ORDER BY started_at
TTL toDateTime(started_at) + INTERVAL 365 DAY
"#;

/// Internal metrics snapshots (dogfooding).
pub const CREATE_METRICS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS internal_metrics (
    timestamp DateTime64(3),
    sync_runs UInt64,
    sync_failures UInt64,
    campaigns_synced UInt64,
    campaign_sync_errors UInt64,
    records_synced UInt64,
    records_rejected UInt64,
    meta_requests UInt64,
    meta_request_errors UInt64,
    store_reads UInt64,
    store_writes UInt64,
    store_errors UInt64,
    aggregate_requests UInt64,
    exports_generated UInt64,
    cache_hits UInt64,
    cache_misses UInt64,
    meta_latency_mean_ms Float64,
    store_latency_mean_ms Float64,
    sync_duration_mean_ms Float64,
    campaigns_tracked UInt64,
    last_sync_records UInt64
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(timestamp)
ORDER BY timestamp
TTL toDateTime(timestamp) + INTERVAL 30 DAY
"#;

/// `CREATE DATABASE` statement, run against the `default` database.
pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS `{}`", database.replace('`', ""))
}

/// Table DDL in creation order.
pub fn all_tables() -> Vec<&'static str> {
    vec![
        CREATE_DAILY_METRICS_TABLE,
        CREATE_CAMPAIGNS_TABLE,
        CREATE_AD_ACCOUNTS_TABLE,
        CREATE_SYNC_RUNS_TABLE,
        CREATE_METRICS_TABLE,
    ]
}
