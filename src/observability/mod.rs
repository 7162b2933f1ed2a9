//! Logging setup
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` takes precedence
//! over the configured filter.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log line layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, for terminals
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("a global logger is already installed")]
    AlreadyInitialized,
}

/// Resolves the filter: `RUST_LOG` if set, else `configured`.
pub fn resolve_filter(configured: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(configured).map_err(|e| LoggingError::InvalidFilter {
        filter: configured.to_string(),
        reason: e.to_string(),
    })
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logging(configured: &str, format: LogFormat) -> Result<(), LoggingError> {
    let filter = resolve_filter(configured)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_timer(ChronoUtc::rfc_3339()))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init(),
    };
    installed.map_err(|_| LoggingError::AlreadyInitialized)
}
