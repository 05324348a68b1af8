//! Worker scheduler for background tasks.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use clickhouse_client::ClickHouseClient;

use crate::sync::SyncWorker;

/// Worker scheduler configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Automatic sync interval
    pub sync_interval: Duration,
    /// Metrics flush and ClickHouse health probe interval
    pub metrics_flush_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(1800), // 30 minutes
            metrics_flush_interval: Duration::from_secs(60), // 1 minute
        }
    }
}

/// Background worker scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    clickhouse: Option<Arc<ClickHouseClient>>,
    sync: Option<Arc<SyncWorker>>,
}

impl WorkerScheduler {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            clickhouse: None,
            sync: None,
        }
    }

    /// Flush metrics to and probe this ClickHouse instance.
    pub fn with_clickhouse(mut self, clickhouse: Arc<ClickHouseClient>) -> Self {
        self.clickhouse = Some(clickhouse);
        self
    }

    /// Run `sync` on the sync interval.
    pub fn with_sync(mut self, sync: Arc<SyncWorker>) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Starts all background workers.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        if self.sync.is_some() {
            let scheduler = self.clone();
            handles.push(tokio::spawn(async move {
                scheduler.run_sync_worker().await;
            }));
            info!(
                interval_secs = self.config.sync_interval.as_secs(),
                "Sync worker started"
            );
        } else {
            warn!("Meta API not configured, automatic sync disabled");
        }

        if self.clickhouse.is_some() {
            let scheduler = self.clone();
            handles.push(tokio::spawn(async move {
                scheduler.run_metrics_flush().await;
            }));
        }

        info!("Background workers started");
        handles
    }

    async fn run_sync_worker(&self) {
        let Some(worker) = self.sync.as_ref() else {
            return;
        };
        let mut ticker = interval(self.config.sync_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Err(e) = worker.run_once().await {
                error!("Sync worker error: {}", e);
            }
        }
    }

    async fn run_metrics_flush(&self) {
        use clickhouse_client::health::check_connection;
        use clickhouse_client::insert::insert_metrics;
        use telemetry::{health, metrics};

        let Some(clickhouse) = self.clickhouse.as_ref() else {
            return;
        };
        let mut ticker = interval(self.config.metrics_flush_interval);

        loop {
            ticker.tick().await;

            if check_connection(clickhouse).await {
                health().clickhouse.set_healthy();
            } else {
                health().clickhouse.set_unhealthy("ClickHouse is not reachable");
                continue;
            }

            let snapshot = metrics().snapshot();
            if let Err(e) = insert_metrics(clickhouse, snapshot).await {
                error!("Failed to flush metrics: {}", e);
            }
        }
    }
}
