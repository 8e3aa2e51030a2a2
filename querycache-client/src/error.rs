//! Error types for the demo client.

use crate::config::ConfigError;
use querycache_core::CacheError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("Failed to init tracing subscriber: {0}")]
    Telemetry(String),
}
