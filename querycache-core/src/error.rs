//! Error types for querycache operations

use crate::CacheKey;
use thiserror::Error;

/// Transport failures. Surfaced to the caller, who may retry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Transport failed: {reason}")]
    Transport { reason: String },

    #[error("Server responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Failed to decode response: {reason}")]
    Decode { reason: String },

    #[error("GraphQL errors: {}", messages.join("; "))]
    GraphQl { messages: Vec<String> },

    #[error("Request interrupted: {reason}")]
    Interrupted { reason: String },
}

impl NetworkError {
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }
}

/// Master error type for cache operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache miss for {key}: no complete entry and policy forbids network")]
    CacheMiss { key: CacheKey },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

impl CacheError {
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, Self::CacheMiss { .. })
    }

    /// Network errors may succeed on a later attempt. Cache misses will not.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Variables;

    #[test]
    fn test_cache_miss_display_names_key() {
        let key = CacheKey::new("Debug", &Variables::new().with("id", "1000"));
        let err = CacheError::CacheMiss { key };
        let msg = err.to_string();
        assert!(msg.contains("Cache miss"));
        assert!(msg.contains(r#"Debug({"id":"1000"})"#));
        assert!(err.is_cache_miss());
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_network_error_converts() {
        let err: CacheError = NetworkError::Timeout { after_ms: 250 }.into();
        assert!(err.is_retriable());
        assert_eq!(err.to_string(), "Network error: Request timed out after 250ms");
    }

    #[test]
    fn test_graphql_error_joins_messages() {
        let err = NetworkError::GraphQl {
            messages: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "GraphQL errors: a; b");
    }

    #[test]
    fn test_errors_are_clone_and_eq() {
        let err = CacheError::from(NetworkError::transport("connection refused"));
        assert_eq!(err.clone(), err);
    }
}
