//! In-flight request sharing and waiter detachment.

use futures_util::{StreamExt, TryStreamExt};
use querycache_store::{FetchPolicy, NetworkError, NetworkStatus, QueryCache, QuerySnapshot};
use querycache_test_utils::{character_query, character_vars, rick, MockTransport};
use std::sync::Arc;
use std::time::Duration;

async fn wait_until_settled(cache: &QueryCache<MockTransport>, id: &str) {
    let key = character_query().key(&character_vars(id));
    tokio::time::timeout(Duration::from_secs(5), async {
        while cache.is_in_flight(&key) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("request did not settle");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_network_only_fetches_issue_one_request() {
    let (transport, gate) = MockTransport::gated();
    let transport = Arc::new(transport.with_response("1000", rick()));
    let cache = QueryCache::new(Arc::clone(&transport));
    let query = character_query();
    let vars = character_vars("1000");

    let mut a = Box::pin(cache.fetch(&query, &vars, FetchPolicy::NetworkOnly));
    let mut b = Box::pin(cache.fetch(&query, &vars, FetchPolicy::NetworkOnly));

    let a_first = a.next().await.unwrap().unwrap();
    let b_first = b.next().await.unwrap().unwrap();
    assert_eq!(a_first, QuerySnapshot::loading());
    assert_eq!(b_first, QuerySnapshot::loading());
    assert!(cache.is_in_flight(&query.key(&vars)));

    gate.release(1);
    let a_last = a.next().await.unwrap().unwrap();
    let b_last = b.next().await.unwrap().unwrap();

    assert_eq!(a_last, b_last);
    assert_eq!(a_last, QuerySnapshot::ready(rick(), true));
    assert_eq!(transport.call_count(), 1);
    assert_eq!(cache.stats().deduplicated, 1);
    assert_eq!(cache.stats().network_requests, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mixed_policies_share_the_same_request() {
    let (transport, gate) = MockTransport::gated();
    let transport = Arc::new(transport.with_response("1000", rick()));
    let cache = QueryCache::new(Arc::clone(&transport));
    let query = character_query();
    let vars = character_vars("1000");

    let mut a = Box::pin(cache.fetch(&query, &vars, FetchPolicy::CacheAndNetwork));
    let mut b = Box::pin(cache.fetch(&query, &vars, FetchPolicy::CacheFirst));
    let mut c = Box::pin(cache.fetch(&query, &vars, FetchPolicy::NetworkOnly));

    for stream in [&mut a, &mut b, &mut c] {
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.network_status, NetworkStatus::Loading);
    }

    gate.release(1);
    let results: Vec<QuerySnapshot> = vec![
        a.try_next().await.unwrap().unwrap(),
        b.try_next().await.unwrap().unwrap(),
        c.try_next().await.unwrap().unwrap(),
    ];

    assert!(results.iter().all(|s| s == &QuerySnapshot::ready(rick(), true)));
    assert_eq!(transport.call_count(), 1);
    assert_eq!(cache.stats().deduplicated, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failure_reaches_every_waiter() {
    let (transport, gate) = MockTransport::gated();
    transport.fail("1000", NetworkError::transport("connection reset"));
    let transport = Arc::new(transport);
    let cache = QueryCache::new(Arc::clone(&transport));
    let query = character_query();
    let vars = character_vars("1000");

    let mut a = Box::pin(cache.fetch(&query, &vars, FetchPolicy::NetworkOnly));
    let mut b = Box::pin(cache.fetch(&query, &vars, FetchPolicy::NetworkOnly));
    a.next().await.unwrap().unwrap();
    b.next().await.unwrap().unwrap();

    gate.release(1);
    let a_err = a.next().await.unwrap().unwrap_err();
    let b_err = b.next().await.unwrap().unwrap_err();

    assert_eq!(a_err, b_err);
    assert!(a_err.is_retriable());
    assert_eq!(transport.call_count(), 1);
    assert!(cache.read(&query.key(&vars)).data().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn detached_waiter_does_not_cancel_request() {
    let (transport, gate) = MockTransport::gated();
    let transport = Arc::new(transport.with_response("1000", rick()));
    let cache = QueryCache::new(Arc::clone(&transport));
    let query = character_query();
    let vars = character_vars("1000");

    let mut a = Box::pin(cache.fetch(&query, &vars, FetchPolicy::NetworkOnly));
    let mut b = Box::pin(cache.fetch(&query, &vars, FetchPolicy::NetworkOnly));
    a.next().await.unwrap().unwrap();
    b.next().await.unwrap().unwrap();
    drop(a);

    gate.release(1);
    let b_last = b.next().await.unwrap().unwrap();

    assert_eq!(b_last, QuerySnapshot::ready(rick(), true));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn request_completes_after_every_waiter_detaches() {
    let (transport, gate) = MockTransport::gated();
    let transport = Arc::new(transport.with_response("1000", rick()));
    let cache = QueryCache::new(Arc::clone(&transport));
    let query = character_query();
    let vars = character_vars("1000");

    let mut a = Box::pin(cache.fetch(&query, &vars, FetchPolicy::NetworkOnly));
    a.next().await.unwrap().unwrap();
    drop(a);

    gate.release(1);
    wait_until_settled(&cache, "1000").await;

    let read = cache.read(&query.key(&vars));
    assert_eq!(read.data(), Some(&rick()));
    assert!(read.is_complete());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn distinct_keys_do_not_share_requests() {
    let (transport, gate) = MockTransport::gated();
    let transport = Arc::new(transport.with_response("1000", rick()));
    let cache = QueryCache::new(Arc::clone(&transport));
    let query = character_query();

    let mut a = Box::pin(cache.fetch(&query, &character_vars("1000"), FetchPolicy::NetworkOnly));
    let mut b = Box::pin(cache.fetch(&query, &character_vars("2001"), FetchPolicy::NetworkOnly));
    a.next().await.unwrap().unwrap();
    b.next().await.unwrap().unwrap();

    gate.release(2);
    a.next().await.unwrap().unwrap();
    b.next().await.unwrap().unwrap();

    assert_eq!(transport.call_count(), 2);
    assert_eq!(cache.stats().deduplicated, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn new_request_starts_after_previous_settles() {
    let (transport, gate) = MockTransport::gated();
    let transport = Arc::new(transport.with_response("1000", rick()));
    let cache = QueryCache::new(Arc::clone(&transport));
    let query = character_query();
    let vars = character_vars("1000");

    gate.release(2);
    let first: Vec<_> = cache
        .fetch(&query, &vars, FetchPolicy::NetworkOnly)
        .try_collect()
        .await
        .unwrap();
    let second: Vec<_> = cache
        .fetch(&query, &vars, FetchPolicy::NetworkOnly)
        .try_collect()
        .await
        .unwrap();

    assert_eq!(first.last(), second.last());
    assert_eq!(transport.call_count(), 2);
}
