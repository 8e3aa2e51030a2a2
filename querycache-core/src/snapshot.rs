//! Observable results: fetch snapshots and direct cache reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::policy::NetworkStatus;

/// One status update emitted by a fetch.
///
/// This is the shape a presentation layer renders or logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySnapshot {
    pub loading: bool,
    pub network_status: NetworkStatus,
    pub data: Option<Value>,
    pub complete: bool,
}

impl QuerySnapshot {
    /// Initial fetch with nothing cached to show.
    pub fn loading() -> Self {
        Self {
            loading: true,
            network_status: NetworkStatus::Loading,
            data: None,
            complete: false,
        }
    }

    /// Loading while showing whatever partial data is cached.
    pub fn loading_with(data: Option<Value>) -> Self {
        Self {
            data,
            ..Self::loading()
        }
    }

    /// Refetching while showing cached data.
    pub fn refetching(data: Value, complete: bool) -> Self {
        Self {
            loading: true,
            network_status: NetworkStatus::Refetch,
            data: Some(data),
            complete,
        }
    }

    /// Settled result.
    pub fn ready(data: Value, complete: bool) -> Self {
        Self {
            loading: false,
            network_status: NetworkStatus::Ready,
            data: Some(data),
            complete,
        }
    }

    pub fn is_settled(&self) -> bool {
        !self.loading && self.network_status == NetworkStatus::Ready
    }
}

/// Result of a direct cache read. Never involves I/O.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CacheRead {
    data: Option<Value>,
    complete: bool,
    last_fetched_at: Option<DateTime<Utc>>,
}

impl CacheRead {
    pub fn new(data: Option<Value>, complete: bool, last_fetched_at: Option<DateTime<Utc>>) -> Self {
        Self {
            data,
            complete,
            last_fetched_at,
        }
    }

    /// The read for a key that was never stored.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<Value> {
        self.data
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn is_absent(&self) -> bool {
        self.data.is_none()
    }

    /// Whether data exists but is missing requested fields.
    pub fn is_partial(&self) -> bool {
        self.data.is_some() && !self.complete
    }

    /// When the data was last written from a network response, if ever.
    pub fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.last_fetched_at
    }

    /// Time since the last network write. `None` if never fetched.
    pub fn staleness(&self) -> Option<Duration> {
        let fetched_at = self.last_fetched_at?;
        Some(
            Utc::now()
                .signed_duration_since(fetched_at)
                .to_std()
                .unwrap_or(Duration::ZERO),
        )
    }
}
