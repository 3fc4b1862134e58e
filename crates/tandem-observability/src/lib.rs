//! Tandem Observability
//!
//! Installs the process-wide `tracing` subscriber. The runtime emits
//! structured events under an `orchestrator_step` span per step and a
//! `memory_worker` span on the consolidation thread; this crate only decides
//! where they go and at what level.

use serde::Deserialize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub format: LogFormat,
    /// Filter directives used when `RUST_LOG` is unset
    pub default_filter: String,
    /// Include the emitting thread's name (the memory worker's is configurable)
    pub thread_names: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            default_filter: "info".to_string(),
            thread_names: true,
        }
    }
}

impl TracingConfig {
    pub fn pretty() -> Self {
        Self {
            format: LogFormat::Pretty,
            ..Self::default()
        }
    }

    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ObservabilityError {
    #[error("Invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,
}

/// Build the level filter: `rust_log` wins over the configured default.
pub fn build_filter(
    rust_log: Option<&str>,
    config: &TracingConfig,
) -> Result<EnvFilter, ObservabilityError> {
    let directives = rust_log
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(&config.default_filter);
    EnvFilter::try_new(directives).map_err(|e| ObservabilityError::InvalidFilter {
        filter: directives.to_string(),
        message: e.to_string(),
    })
}

/// Initialize the global tracing subscriber
pub fn init_tracing(config: &TracingConfig) -> Result<(), ObservabilityError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(rust_log.as_deref(), config)?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_thread_names(config.thread_names),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_thread_names(config.thread_names),
            )
            .try_init(),
    };
    installed.map_err(|_| ObservabilityError::AlreadyInitialized)?;

    tracing::info!(
        format = ?config.format,
        filter = rust_log.as_deref().unwrap_or(&config.default_filter),
        "Initialized structured tracing"
    );
    Ok(())
}
