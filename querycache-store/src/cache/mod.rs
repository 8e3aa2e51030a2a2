//! Query result caching with explicit fetch policies.
//!
//! # Overview
//!
//! Every fetch names a [`FetchPolicy`](querycache_core::FetchPolicy) and gets
//! back a stream of [`QuerySnapshot`](querycache_core::QuerySnapshot)s, so
//! the caller always sees whether data came from the cache, is being
//! refreshed, or has settled from the network.
//!
//! # Example
//!
//! ```ignore
//! use futures_util::StreamExt;
//!
//! let mut updates = cache.fetch(&query, &vars, FetchPolicy::CacheAndNetwork);
//! while let Some(snapshot) = updates.next().await {
//!     let snapshot = snapshot?;
//!     if snapshot.loading {
//!         tracing::debug!(status = %snapshot.network_status, "Still loading");
//!     }
//! }
//! ```

mod entry;
mod merge;
mod query_cache;
mod stats;

pub use entry::{CacheEntry, InFlightRequest, RequestOutcome, Settled};
pub use merge::deep_merge;
pub use query_cache::QueryCache;
pub use stats::CacheStats;
