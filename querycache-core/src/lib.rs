//! querycache Core - Data Types
//!
//! Query identity, cache keys, fetch policies, snapshots, and the transport
//! capability. This crate performs no I/O; the cache itself lives in
//! querycache-store.

pub mod error;
pub mod policy;
pub mod query;
pub mod response;
pub mod snapshot;
pub mod transport;

pub use error::{CacheError, CacheResult, NetworkError};
pub use policy::{FetchPolicy, NetworkStatus};
pub use query::{CacheKey, FieldPath, Query, Variables};
pub use response::{GraphQlError, ResponseData};
pub use snapshot::{CacheRead, QuerySnapshot};
pub use transport::Transport;

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
