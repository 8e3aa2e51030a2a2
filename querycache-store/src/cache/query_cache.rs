//! Read-through query cache with in-flight request deduplication.
//!
//! This module routes each fetch according to its policy, shares a single
//! network request between every caller of the same key, and merges
//! responses back into the store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_stream::stream;
use chrono::Utc;
use dashmap::DashMap;
use futures_util::Stream;
use querycache_core::{
    CacheError, CacheKey, CacheRead, CacheResult, FetchPolicy, NetworkError, Query, QuerySnapshot,
    ResponseData, Transport, Variables,
};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn, Instrument};

use super::entry::{CacheEntry, InFlightRequest, RequestOutcome};
use super::stats::{CacheStats, StatsCounters};

/// How a single fetch will proceed, decided atomically against the store.
enum Plan {
    /// Answer from cache with one settled snapshot.
    Serve(QuerySnapshot),
    /// Emit `first`, then wait on the shared request.
    Network {
        first: QuerySnapshot,
        request: InFlightRequest,
    },
}

/// Request-deduplicating read-through cache for keyed queries.
///
/// Entries live for the lifetime of the cache. At most one network request
/// is in flight per key; later fetches for the same key wait on it.
///
/// # Example
///
/// ```ignore
/// let cache = QueryCache::new(transport);
/// let vars = Variables::new().with("id", "1000");
///
/// let snapshots: Vec<_> = cache
///     .fetch(&query, &vars, FetchPolicy::CacheAndNetwork)
///     .try_collect()
///     .await?;
///
/// // Second time around the first snapshot carries cached data.
/// let read = cache.read(&query.key(&vars));
/// assert!(read.is_complete());
/// ```
pub struct QueryCache<T>
where
    T: Transport + 'static,
{
    transport: Arc<T>,
    entries: Arc<DashMap<CacheKey, CacheEntry>>,
    stats: Arc<StatsCounters>,
    next_request_id: Arc<AtomicU64>,
}

impl<T> QueryCache<T>
where
    T: Transport + 'static,
{
    /// Create an empty cache that sends through `transport`.
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            entries: Arc::new(DashMap::new()),
            stats: Arc::new(StatsCounters::default()),
            next_request_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Get a reference to the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Look up `key` without any I/O.
    pub fn read(&self, key: &CacheKey) -> CacheRead {
        self.entries
            .get(key)
            .map(|entry| entry.read())
            .unwrap_or_else(CacheRead::absent)
    }

    /// Whether a network request for `key` is currently pending.
    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.in_flight().is_some())
    }

    /// Write `data` for `query` directly, as if it had been fetched.
    ///
    /// Completeness is judged against the query's requested fields. Any
    /// pending request for the key is left alone and will merge over this.
    pub fn write(&self, query: &Query, variables: &Variables, data: Value) -> CacheRead {
        let key = query.key(variables);
        let complete = query.is_complete(&data);
        let mut entry = self.entries.entry(key.clone()).or_default();
        entry.overwrite(data, complete);
        debug!(key = %key, complete, "Wrote query data");
        entry.read()
    }

    /// Number of entries in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len() as u64)
    }

    /// Fetch `query` under `policy`, yielding status snapshots.
    ///
    /// The stream is lazy: nothing happens until it is first polled, and it
    /// must be polled from within a tokio runtime. It yields one snapshot
    /// for a cache answer, or a loading snapshot followed by a settled one
    /// when the network is involved. `cache-only` without a complete entry
    /// yields `CacheError::CacheMiss`; transport failures yield
    /// `CacheError::Network` and leave the stored entry untouched.
    ///
    /// Dropping the stream never cancels a request that was already issued.
    pub fn fetch(
        &self,
        query: &Query,
        variables: &Variables,
        policy: FetchPolicy,
    ) -> impl Stream<Item = CacheResult<QuerySnapshot>> + Send + 'static {
        let cache = self.clone();
        let query = query.clone();
        let variables = variables.clone();

        stream! {
            let key = query.key(&variables);
            match cache.plan(&query, &variables, &key, policy) {
                Err(err) => {
                    yield Err(err);
                }
                Ok(Plan::Serve(snapshot)) => {
                    yield Ok(snapshot);
                }
                Ok(Plan::Network { first, request }) => {
                    yield Ok(first);
                    match request.wait().await {
                        Ok(settled) => {
                            yield Ok(QuerySnapshot::ready(settled.data, settled.complete));
                        }
                        Err(err) => {
                            yield Err(CacheError::from(err));
                        }
                    }
                }
            }
        }
    }

    /// Decide how a fetch proceeds and register its network leg if needed.
    fn plan(
        &self,
        query: &Query,
        variables: &Variables,
        key: &CacheKey,
        policy: FetchPolicy,
    ) -> CacheResult<Plan> {
        if policy == FetchPolicy::CacheOnly {
            let cached = self.read(key);
            return match (cached.is_complete(), cached.into_data()) {
                (true, Some(data)) => {
                    self.stats.record_hit();
                    debug!(key = %key, policy = %policy, "Served from cache");
                    Ok(Plan::Serve(QuerySnapshot::ready(data, true)))
                }
                _ => {
                    self.stats.record_miss();
                    debug!(key = %key, policy = %policy, "Cache miss");
                    Err(CacheError::CacheMiss { key: key.clone() })
                }
            };
        }

        let mut entry = self.entries.entry(key.clone()).or_default();
        let cached = entry.read();

        let first = match policy {
            FetchPolicy::CacheFirst => match (cached.is_complete(), cached.into_data()) {
                (true, Some(data)) => {
                    drop(entry);
                    self.stats.record_hit();
                    debug!(key = %key, policy = %policy, "Served from cache");
                    return Ok(Plan::Serve(QuerySnapshot::ready(data, true)));
                }
                (_, partial) => {
                    self.stats.record_miss();
                    QuerySnapshot::loading_with(partial)
                }
            },
            FetchPolicy::CacheAndNetwork => {
                let complete = cached.is_complete();
                match cached.into_data() {
                    Some(data) => {
                        self.stats.record_hit();
                        QuerySnapshot::refetching(data, complete)
                    }
                    None => {
                        self.stats.record_miss();
                        QuerySnapshot::loading()
                    }
                }
            }
            FetchPolicy::NetworkOnly | FetchPolicy::CacheOnly => QuerySnapshot::loading(),
        };

        let mut sender = None;
        let (request, started) = entry.attach_or_start(|| {
            let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
            let (request, tx) = InFlightRequest::channel(id);
            sender = Some(tx);
            request
        });
        // The spawned task takes this key's guard when it settles.
        drop(entry);

        match sender {
            Some(tx) if started => {
                self.spawn_request(query.clone(), variables.clone(), key.clone(), request.id(), tx);
            }
            _ => {
                self.stats.record_deduplicated();
                debug!(
                    key = %key,
                    policy = %policy,
                    request_id = request.id(),
                    "Attached to in-flight request"
                );
            }
        }

        Ok(Plan::Network { first, request })
    }

    /// Issue the transport call on its own task so it always runs to completion.
    fn spawn_request(
        &self,
        query: Query,
        variables: Variables,
        key: CacheKey,
        request_id: u64,
        tx: oneshot::Sender<RequestOutcome>,
    ) {
        let transport = Arc::clone(&self.transport);
        let entries = Arc::clone(&self.entries);
        let stats = Arc::clone(&self.stats);
        stats.record_network_request();

        let span = tracing::debug_span!("network_request", key = %key, request_id);
        tokio::spawn(
            async move {
                debug!("Sending query");
                let response = transport.send(&query, &variables).await;
                let outcome = settle(&entries, &key, &query, request_id, response);

                match &outcome {
                    Ok(settled) => debug!(complete = settled.complete, "Merged response"),
                    Err(err) => {
                        stats.record_failure();
                        warn!(error = %err, "Network request failed; cache entry left unchanged");
                    }
                }

                // Every waiter may already have detached.
                let _ = tx.send(outcome);
            }
            .instrument(span),
        );
    }
}

/// Apply a transport result to the store and release the in-flight slot.
fn settle(
    entries: &DashMap<CacheKey, CacheEntry>,
    key: &CacheKey,
    query: &Query,
    request_id: u64,
    response: Result<ResponseData, NetworkError>,
) -> RequestOutcome {
    let mut entry = entries.entry(key.clone()).or_default();
    entry.finish_request(request_id);

    let response = response?;
    if let Some(err) = response.failure() {
        return Err(err);
    }

    let complete = query.is_complete(&response.data);
    Ok(entry.apply_response(response.data, complete, Utc::now()))
}

impl<T> Clone for QueryCache<T>
where
    T: Transport + 'static,
{
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            entries: Arc::clone(&self.entries),
            stats: Arc::clone(&self.stats),
            next_request_id: Arc::clone(&self.next_request_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures_util::TryStreamExt;
    use querycache_core::NetworkStatus;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    struct StaticTransport {
        response: Result<ResponseData, NetworkError>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for StaticTransport {
        async fn send(
            &self,
            _query: &Query,
            _variables: &Variables,
        ) -> Result<ResponseData, NetworkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    fn query() -> Query {
        Query::new("Debug", "query Debug($id: ID!) { character(id: $id) { name } }")
            .require("character")
            .require("character.name")
    }

    fn cache_with(response: Result<ResponseData, NetworkError>) -> QueryCache<StaticTransport> {
        QueryCache::new(Arc::new(StaticTransport {
            response,
            calls: Default::default(),
        }))
    }

    #[tokio::test]
    async fn test_read_absent_key() {
        let cache = cache_with(Ok(ResponseData::default()));
        let read = cache.read(&query().key(&Variables::new().with("id", "1")));
        assert!(read.data().is_none());
        assert!(!read.is_complete());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_network_only_settles_and_stores() {
        let cache = cache_with(Ok(ResponseData::new(json!({"character": {"name": "Rick"}}))));
        let vars = Variables::new().with("id", "1000");

        let snapshots: Vec<_> = cache
            .fetch(&query(), &vars, FetchPolicy::NetworkOnly)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].network_status, NetworkStatus::Loading);
        assert_eq!(snapshots[1].network_status, NetworkStatus::Ready);
        assert!(snapshots[1].complete);

        let read = cache.read(&query().key(&vars));
        assert!(read.is_complete());
        assert!(read.last_fetched_at().is_some());
        assert!(!cache.is_in_flight(&query().key(&vars)));
    }

    #[tokio::test]
    async fn test_graphql_failure_is_network_error() {
        let cache = cache_with(Ok(ResponseData::with_errors(
            Value::Null,
            vec![querycache_core::GraphQlError::new("not found")],
        )));
        let vars = Variables::new().with("id", "404");

        let result: CacheResult<Vec<_>> = cache
            .fetch(&query(), &vars, FetchPolicy::NetworkOnly)
            .try_collect()
            .await;

        assert_eq!(
            result.unwrap_err(),
            CacheError::Network(NetworkError::GraphQl {
                messages: vec!["not found".to_string()]
            })
        );
        assert!(cache.read(&query().key(&vars)).data().is_none());
    }

    #[tokio::test]
    async fn test_write_judges_completeness() {
        let cache = cache_with(Ok(ResponseData::default()));
        let vars = Variables::new().with("id", "1");

        let read = cache.write(&query(), &vars, json!({"character": {}}));
        assert!(read.is_partial());

        let read = cache.write(&query(), &vars, json!({"character": {"name": "Rick"}}));
        assert!(read.is_complete());
        assert!(read.last_fetched_at().is_none());
        assert_eq!(cache.len(), 1);
    }
}
