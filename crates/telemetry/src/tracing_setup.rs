//! Tracing setup for structured logging.

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    /// Log level filter (e.g., "info", "api=debug")
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Whether to output JSON format
    #[serde(default)]
    pub json: bool,
    /// Whether to include span events
    #[serde(default)]
    pub span_events: bool,
    /// Directory for a daily rolling log file, in addition to stdout
    #[serde(default)]
    pub file_dir: Option<String>,
    /// File name prefix inside `file_dir`
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_filter() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "ads-dashboard.log".to_string()
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
            span_events: false,
            file_dir: None,
            file_prefix: default_file_prefix(),
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_file_dir(mut self, dir: impl Into<String>) -> Self {
        self.file_dir = Some(dir.into());
        self
    }
}

/// Initialize tracing with the given configuration.
///
/// When a log directory is configured the returned guard must be held for
/// the lifetime of the process, or buffered file output is lost.
pub fn init_tracing(config: TracingConfig) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let span_events = || {
        if config.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    };

    let stdout_layer = if config.json {
        fmt::layer()
            .json()
            .with_span_events(span_events())
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_span_events(span_events())
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = match config.file_dir.as_deref() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    tracing::info!(
        filter = %config.filter,
        log_dir = config.file_dir.as_deref().unwrap_or("-"),
        "Tracing initialized"
    );

    guard
}
