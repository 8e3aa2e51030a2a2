//! querycache demo entry point.

use querycache_client::config::DemoConfig;
use querycache_client::error::ClientError;
use querycache_client::harness::Harness;
use querycache_client::telemetry;
use querycache_client::transport::HttpTransport;
use querycache_store::QueryCache;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let config = DemoConfig::load()?;
    telemetry::init_tracing(&config.log)?;

    let transport = Arc::new(HttpTransport::new(&config)?);
    tracing::info!(
        endpoint = transport.endpoint(),
        policy = %config.fetch_policy,
        lookups = config.lookups.len(),
        "Starting lookups"
    );

    let harness = Harness::new(QueryCache::new(transport), config.fetch_policy);
    let reports = harness.run(&config.lookups).await;

    for report in &reports {
        match &report.error {
            None => println!("{}: {}", report.id, report.messages.join(" -> ")),
            Some(err) => println!("{}: failed ({})", report.id, err),
        }
    }

    let stats = harness.cache().stats();
    println!(
        "hits={} misses={} hit_rate={:.2} network_requests={} deduplicated={} failures={} entries={}",
        stats.hits,
        stats.misses,
        stats.hit_rate(),
        stats.network_requests,
        stats.deduplicated,
        stats.failures,
        stats.entry_count,
    );

    Ok(())
}
