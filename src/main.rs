//! Ads Dashboard backend
//!
//! Serves KPI aggregates over daily campaign metrics:
//! - Periodic Meta Marketing API sync into ClickHouse
//! - Summary, time series and period comparison endpoints
//! - CSV and XLSX report exports

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState};
use clickhouse_client::{ClickHouseClient, ClickHouseConfig, ClickHouseStore, MetricStore};
use meta_ads::{InsightsSource, MetaAdsClient, MetaConfig};
use telemetry::{health, init_tracing, TracingConfig};
use worker::{SyncConfig, SyncWorker, WorkerConfig, WorkerScheduler};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct AppConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// Seconds between internal metrics flushes
    #[serde(default = "default_metrics_flush_secs")]
    metrics_flush_secs: u64,

    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(default)]
    meta: MetaConfig,

    #[serde(default)]
    sync: SyncConfig,

    #[serde(default)]
    log: TracingConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_metrics_flush_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            metrics_flush_secs: default_metrics_flush_secs(),
            clickhouse: ClickHouseConfig::default(),
            meta: MetaConfig::default(),
            sync: SyncConfig::default(),
            log: TracingConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = load_config()?;

    // Held until exit so buffered file logs are flushed
    let _log_guard = init_tracing(config.log.clone());

    info!("Starting Ads Dashboard v{}", env!("CARGO_PKG_VERSION"));

    let clickhouse = Arc::new(
        ClickHouseClient::new(config.clickhouse.clone())
            .context("Failed to create ClickHouse client")?,
    );

    if config.clickhouse.init_schema {
        if let Err(e) = clickhouse_client::health::init_schema(&clickhouse).await {
            error!("Failed to initialize ClickHouse schema: {}", e);
            // Continue anyway - schema might already exist
        }
    }

    let store: Arc<dyn MetricStore> = Arc::new(ClickHouseStore::new(clickhouse.clone()));

    let meta = if config.meta.is_configured() {
        Some(Arc::new(
            MetaAdsClient::new(config.meta.clone()).context("Failed to create Meta Ads client")?,
        ))
    } else {
        warn!("No Meta access token configured, serving stored data only");
        None
    };

    check_health(&clickhouse, meta.as_deref()).await;

    let sync = meta.map(|client| {
        let source: Arc<dyn InsightsSource> = client;
        Arc::new(SyncWorker::new(source, store.clone(), config.sync.clone()))
    });

    let mut scheduler = WorkerScheduler::new(WorkerConfig {
        sync_interval: config.sync.interval(),
        metrics_flush_interval: Duration::from_secs(config.metrics_flush_secs.max(1)),
    })
    .with_clickhouse(clickhouse.clone());
    if let Some(sync) = sync.as_ref().filter(|_| config.sync.enabled) {
        scheduler = scheduler.with_sync(sync.clone());
    }
    let _worker_handles = Arc::new(scheduler).start();

    let mut state = AppState::new(store);
    if let Some(sync) = sync {
        state = state.with_sync(sync);
    }

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
///
/// Nested keys use a double underscore, e.g. `DASHBOARD__META__ACCESS_TOKEN`.
fn load_config() -> Result<AppConfig> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&AppConfig::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::with_prefix("DASHBOARD")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Check component health on startup.
async fn check_health(clickhouse: &ClickHouseClient, meta: Option<&MetaAdsClient>) {
    if clickhouse_client::health::check_connection(clickhouse).await {
        health().clickhouse.set_healthy();
        info!("ClickHouse connection: healthy");
    } else {
        health().clickhouse.set_unhealthy("Connection failed");
        error!("ClickHouse connection: unhealthy");
    }

    match meta {
        Some(client) => {
            if meta_ads::health::check_connection(client).await {
                info!("Meta API token: valid");
            } else {
                warn!("Meta API token: invalid, syncs will fail until it is replaced");
            }
        }
        None => health().meta_api.set_unhealthy("no access token configured"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => error!("Failed to install signal handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
