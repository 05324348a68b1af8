//! Sync worker pulling accounts, campaigns and daily insights from the
//! Meta Marketing API into the metric store.
//!
//! One cycle:
//! 1. List ad accounts and store them
//! 2. List each account's campaigns and store them
//! 3. Fetch daily insights for campaigns with a configured status
//! 4. Upsert the validated records and write a `SyncRun`
//!
//! A failing campaign is logged and counted; only an expired token or an
//! unreachable account listing stops the cycle.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashboard_core::limits::DEFAULT_RANGE_DAYS;
use dashboard_core::{
    CampaignStatus, DailyMetricRecord, DateWindow, Error, RecordSet, Result, SyncOutcome, SyncRun,
};
use clickhouse_client::MetricStore;
use meta_ads::InsightsSource;
use serde::{Deserialize, Serialize};
use telemetry::{health, metrics};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Sync worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Run the periodic sync loop
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Seconds between automatic syncs
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Days of insights fetched per cycle, ending today
    #[serde(default = "default_range_days")]
    pub range_days: i64,
    /// Campaign statuses whose insights are fetched
    #[serde(default = "default_statuses")]
    pub statuses: Vec<CampaignStatus>,
    /// Maximum retries for a failed store write
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    1800
}

fn default_range_days() -> i64 {
    DEFAULT_RANGE_DAYS
}

fn default_statuses() -> Vec<CampaignStatus> {
    vec![CampaignStatus::Active]
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    100
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval_secs(),
            range_days: default_range_days(),
            statuses: default_statuses(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Worker that copies Meta insights into the metric store.
pub struct SyncWorker {
    source: Arc<dyn InsightsSource>,
    store: Arc<dyn MetricStore>,
    config: SyncConfig,
    running: Mutex<()>,
    generation: AtomicU64,
}

impl SyncWorker {
    pub fn new(
        source: Arc<dyn InsightsSource>,
        store: Arc<dyn MetricStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
            running: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Bumped after every sync that stored records. Readers caching store
    /// results key them by this value.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Runs one full sync cycle over the last `range_days` days.
    ///
    /// Returns `Error::Conflict` if another sync is in progress. Any other
    /// failure is reported in the returned run.
    pub async fn run_once(&self) -> Result<SyncRun> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| Error::conflict("a sync is already running"))?;

        let window = DateWindow::last_days(Utc::now().date_naive(), self.config.range_days)?;
        let start = Instant::now();
        let mut run = SyncRun::begin(Utc::now());

        info!(run_id = %run.run_id, window = %window, "Sync starting");

        if let Err(e) = self.sync_all(&window, &mut run).await {
            error!(run_id = %run.run_id, "Sync aborted: {}", e);
            if matches!(e, Error::Upstream { .. }) {
                health().meta_api.set_unhealthy(e.to_string());
            }
            run.error = Some(e.to_string());
        }
        run.finished_at = Utc::now();

        if let Err(e) = self.store.record_sync_run(&run).await {
            warn!(run_id = %run.run_id, "Failed to record sync run: {}", e);
        }

        metrics().sync_runs.inc();
        metrics().sync_duration_ms.observe_since(start);
        metrics().last_sync_records.set(run.records);
        if run.records > 0 {
            self.generation.fetch_add(1, Ordering::AcqRel);
        }

        match run.outcome() {
            SyncOutcome::Failed => {
                metrics().sync_failures.inc();
            }
            outcome => {
                health().record_successful_sync(run.finished_at);
                info!(
                    run_id = %run.run_id,
                    outcome = ?outcome,
                    accounts = run.accounts,
                    campaigns = run.campaigns,
                    records = run.records,
                    failed_campaigns = run.failed_campaigns,
                    duration_ms = run.duration_ms(),
                    "Sync finished"
                );
            }
        }

        Ok(run)
    }

    /// Syncs the daily insights of a single campaign over `window`.
    ///
    /// Returns the number of records stored.
    pub async fn sync_campaign(&self, campaign_id: &str, window: &DateWindow) -> Result<u64> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| Error::conflict("a sync is already running"))?;

        let stored = match self.sync_campaign_records(campaign_id, window).await {
            Ok(stored) => stored,
            Err(e) => {
                if e.is_token_expired() {
                    health().meta_api.set_unhealthy(e.to_string());
                }
                return Err(e);
            }
        };
        if stored > 0 {
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        info!(campaign_id = %campaign_id, window = %window, records = stored, "Campaign synced");
        Ok(stored)
    }

    async fn sync_all(&self, window: &DateWindow, run: &mut SyncRun) -> Result<()> {
        let accounts = self.source.ad_accounts().await?;
        health().meta_api.set_healthy();
        run.accounts = u32::try_from(accounts.len()).unwrap_or(u32::MAX);

        self.with_retry("upsert accounts", || self.store.upsert_accounts(&accounts))
            .await?;

        let mut tracked = 0u64;
        for account in &accounts {
            let campaigns = match self.source.campaigns(&account.account_id, &[]).await {
                Ok(campaigns) => campaigns,
                Err(e) if e.is_token_expired() => return Err(e),
                Err(e) => {
                    warn!(account_id = %account.account_id, "Failed to list campaigns: {}", e);
                    continue;
                }
            };
            self.with_retry("upsert campaigns", || self.store.upsert_campaigns(&campaigns))
                .await?;

            for campaign in campaigns
                .iter()
                .filter(|c| self.config.statuses.contains(&c.status))
            {
                tracked += 1;
                run.campaigns += 1;
                match self.sync_campaign_records(&campaign.campaign_id, window).await {
                    Ok(stored) => {
                        run.records += stored;
                        metrics().campaigns_synced.inc();
                    }
                    Err(e) if e.is_token_expired() => return Err(e),
                    Err(e) => {
                        run.failed_campaigns += 1;
                        metrics().campaign_sync_errors.inc();
                        warn!(
                            campaign_id = %campaign.campaign_id,
                            campaign = %campaign.name,
                            "Campaign sync failed: {}",
                            e
                        );
                    }
                }
            }
        }

        metrics().campaigns_tracked.set(tracked);
        Ok(())
    }

    async fn sync_campaign_records(&self, campaign_id: &str, window: &DateWindow) -> Result<u64> {
        let fetched = self.source.campaign_insights(campaign_id, window).await?;
        let records = dedupe(fetched);
        if records.is_empty() {
            debug!(campaign_id = %campaign_id, "No insights in window");
            return Ok(0);
        }

        let stored = self
            .with_retry("upsert records", || self.store.upsert_records(&records))
            .await?;
        let stored = stored as u64;
        metrics().records_synced.inc_by(stored);
        Ok(stored)
    }

    /// Retries `op` with linear backoff. Validation failures and expired
    /// tokens are returned immediately.
    async fn with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = self.config.retry_backoff() * attempt;
                warn!(
                    operation = what,
                    attempt = attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "Retrying after failure"
                );
                tokio::time::sleep(backoff).await;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) => {
                    error!(operation = what, attempt = attempt, "Operation failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::internal(format!("{} failed after retries", what))))
    }
}

fn is_retryable(error: &Error) -> bool {
    match error {
        Error::Database { .. } => true,
        Error::Upstream { .. } => !error.is_token_expired(),
        _ => false,
    }
}

/// Keeps the last record fetched for each `(entity_id, date)`.
fn dedupe(records: Vec<DailyMetricRecord>) -> Vec<DailyMetricRecord> {
    records.into_iter().collect::<RecordSet>().into_vec()
}
