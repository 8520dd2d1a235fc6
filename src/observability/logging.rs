//! # Structured Logging
//!
//! Installs the global `tracing` subscriber: an `EnvFilter` (from `RUST_LOG`, otherwise the
//! configured level) and a `fmt` layer in JSON or human-readable form.

use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::core::config::{LogConfig, LogFormat};
use crate::core::error::ConfigError;

/// Build the level filter: `RUST_LOG` wins over the configured directive
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter, ConfigError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| ConfigError::LogFilter {
            directive: config.level.clone(),
            reason: e.to_string(),
        }),
    }
}

/// Initialize the tracing subscriber
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_logging(config: &LogConfig) -> Result<(), ConfigError> {
    let filter = build_filter(config)?;

    let installed = match config.format {
        LogFormat::Json => Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init(),
        LogFormat::Pretty => Registry::default()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init(),
    };

    if installed.is_err() {
        warn!("Tracing subscriber already initialized, skipping initialization");
        return Ok(());
    }

    info!(format = ?config.format, "Structured logging initialized");
    Ok(())
}
