//! Tracing subscriber setup for the demo binary.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogConfig, LogFormat};
use crate::error::ClientError;

/// Build the filter from `RUST_LOG`, falling back to the configured directive.
pub fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter))
}

/// Install the global subscriber. Call once at startup.
pub fn init_tracing(config: &LogConfig) -> Result<(), ClientError> {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    let result = match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
    };
    result.map_err(|e| ClientError::Telemetry(e.to_string()))?;

    tracing::debug!(format = ?config.format, filter = %config.filter, "Tracing initialized");
    Ok(())
}
