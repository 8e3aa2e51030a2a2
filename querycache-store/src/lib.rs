//! querycache Store - Query Cache Implementation
//!
//! The in-memory, request-deduplicating read-through cache. Data types and
//! the transport capability live in querycache-core.

pub mod cache;

pub use cache::{CacheEntry, CacheStats, InFlightRequest, QueryCache, Settled};

// Re-export core types so callers need only one import path
pub use querycache_core::{
    CacheError, CacheKey, CacheRead, CacheResult, FetchPolicy, NetworkError, NetworkStatus, Query,
    QuerySnapshot, ResponseData, Transport, Variables,
};
