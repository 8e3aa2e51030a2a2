//! Stored entries and in-flight request handles.

use chrono::Utc;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use querycache_core::{CacheRead, NetworkError, Timestamp};
use serde_json::Value;
use std::fmt;
use tokio::sync::oneshot;

use super::merge::deep_merge;

/// Entry state after a request settles.
#[derive(Debug, Clone, PartialEq)]
pub struct Settled {
    /// Stored data after merging the response.
    pub data: Value,
    /// Whether the response resolved every requested field.
    pub complete: bool,
}

/// What every waiter on a request eventually observes.
pub type RequestOutcome = Result<Settled, NetworkError>;

/// Handle to a pending network request shared by all its waiters.
#[derive(Clone)]
pub struct InFlightRequest {
    id: u64,
    started_at: Timestamp,
    outcome: Shared<BoxFuture<'static, RequestOutcome>>,
}

impl InFlightRequest {
    /// Create a handle plus the sender the request task settles it through.
    ///
    /// If the sender is dropped without a value, waiters receive
    /// `NetworkError::Interrupted`.
    pub(crate) fn channel(id: u64) -> (Self, oneshot::Sender<RequestOutcome>) {
        let (tx, rx) = oneshot::channel::<RequestOutcome>();
        let outcome = async move {
            rx.await.unwrap_or_else(|_| {
                Err(NetworkError::Interrupted {
                    reason: "request task ended without a result".to_string(),
                })
            })
        }
        .boxed()
        .shared();

        let handle = Self {
            id,
            started_at: Utc::now(),
            outcome,
        };
        (handle, tx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Wait for the request to settle. Any number of waiters may call this.
    pub async fn wait(&self) -> RequestOutcome {
        self.outcome.clone().await
    }
}

impl fmt::Debug for InFlightRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightRequest")
            .field("id", &self.id)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

/// Stored result and metadata for one cache key.
#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
    data: Option<Value>,
    complete: bool,
    last_fetched_at: Option<Timestamp>,
    in_flight: Option<InFlightRequest>,
}

impl CacheEntry {
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn last_fetched_at(&self) -> Option<Timestamp> {
        self.last_fetched_at
    }

    pub fn in_flight(&self) -> Option<&InFlightRequest> {
        self.in_flight.as_ref()
    }

    pub fn read(&self) -> CacheRead {
        CacheRead::new(self.data.clone(), self.complete, self.last_fetched_at)
    }

    /// Attach to the pending request, or register `start()` as the new one.
    ///
    /// Returns the handle and whether it was newly registered. The caller
    /// holds the entry guard, so check and insert happen atomically.
    pub(crate) fn attach_or_start(
        &mut self,
        start: impl FnOnce() -> InFlightRequest,
    ) -> (InFlightRequest, bool) {
        if let Some(existing) = &self.in_flight {
            return (existing.clone(), false);
        }
        let request = start();
        self.in_flight = Some(request.clone());
        (request, true)
    }

    /// Clear the in-flight handle if it still belongs to `request_id`.
    pub(crate) fn finish_request(&mut self, request_id: u64) {
        if self.in_flight.as_ref().is_some_and(|r| r.id == request_id) {
            self.in_flight = None;
        }
    }

    /// Merge a network response and stamp the fetch time.
    pub(crate) fn apply_response(&mut self, data: Value, complete: bool, at: Timestamp) -> Settled {
        let merged = match self.data.take() {
            Some(mut existing) => {
                deep_merge(&mut existing, data);
                existing
            }
            None => data,
        };
        self.data = Some(merged.clone());
        self.complete = complete;
        self.last_fetched_at = Some(at);
        Settled {
            data: merged,
            complete,
        }
    }

    /// Replace stored data outright, leaving the fetch timestamp alone.
    pub(crate) fn overwrite(&mut self, data: Value, complete: bool) {
        self.data = Some(data);
        self.complete = complete;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_entry_reads_absent() {
        let entry = CacheEntry::default();
        let read = entry.read();
        assert!(read.data().is_none());
        assert!(!read.is_complete());
        assert!(entry.in_flight().is_none());
    }

    #[test]
    fn test_apply_response_merges_and_stamps() {
        let mut entry = CacheEntry::default();
        entry.overwrite(json!({"character": {"id": "1000"}}), false);

        let now = Utc::now();
        let settled = entry.apply_response(json!({"character": {"name": "Rick"}}), true, now);

        assert_eq!(settled.data, json!({"character": {"id": "1000", "name": "Rick"}}));
        assert!(settled.complete);
        assert_eq!(entry.last_fetched_at(), Some(now));
        assert!(entry.is_complete());
    }

    #[test]
    fn test_attach_or_start_reuses_existing_request() {
        let mut entry = CacheEntry::default();
        let (first, started) = entry.attach_or_start(|| InFlightRequest::channel(1).0);
        assert!(started);

        let (second, started) = entry.attach_or_start(|| InFlightRequest::channel(2).0);
        assert!(!started);
        assert_eq!(first.id(), second.id());
    }

    #[test]
    fn test_finish_request_ignores_other_ids() {
        let mut entry = CacheEntry::default();
        entry.attach_or_start(|| InFlightRequest::channel(7).0);

        entry.finish_request(8);
        assert!(entry.in_flight().is_some());

        entry.finish_request(7);
        assert!(entry.in_flight().is_none());
    }

    #[tokio::test]
    async fn test_waiters_share_one_outcome() {
        let (request, tx) = InFlightRequest::channel(1);
        let other = request.clone();

        tx.send(Ok(Settled {
            data: json!({"ok": true}),
            complete: true,
        }))
        .unwrap();

        assert_eq!(request.wait().await, other.wait().await);
    }

    #[tokio::test]
    async fn test_dropped_sender_interrupts_waiters() {
        let (request, tx) = InFlightRequest::channel(1);
        drop(tx);

        let outcome = request.wait().await;
        assert!(matches!(outcome, Err(NetworkError::Interrupted { .. })));
    }
}
