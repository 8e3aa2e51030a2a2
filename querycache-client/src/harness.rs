//! Character lookup harness.
//!
//! Drives the cache through a list of ids with one fetch policy and
//! renders a status line for every snapshot, the way a UI would.

use futures_util::StreamExt;
use querycache_core::{CacheError, FetchPolicy, Query, QuerySnapshot, Transport, Variables};
use querycache_store::QueryCache;
use serde_json::Value;
use tracing::{error, info, info_span, Instrument};

pub const CHARACTER_QUERY: &str = "query Debug($id: ID!) { character(id: $id) { name } }";

pub const LOADING_MESSAGE: &str = "Loading…";

/// The built-in lookup query with its selection declared.
pub fn character_query() -> Query {
    Query::new("Debug", CHARACTER_QUERY)
        .require("character")
        .require("character.name")
}

/// Status line for a snapshot.
///
/// Checked in order: loading, no data, empty object, then the
/// character name.
pub fn render_message(snapshot: &QuerySnapshot) -> String {
    if snapshot.loading {
        return LOADING_MESSAGE.to_string();
    }
    match &snapshot.data {
        None => "undefined".to_string(),
        Some(Value::Object(map)) if map.is_empty() => "{}".to_string(),
        Some(data) => match data.pointer("/character/name") {
            Some(Value::String(name)) => format!("Fetched: {}", name),
            Some(other) => format!("Fetched: {}", other),
            None => "Fetched: undefined".to_string(),
        },
    }
}

/// Outcome of one lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupReport {
    pub id: String,
    pub snapshots: Vec<QuerySnapshot>,
    pub messages: Vec<String>,
    pub error: Option<CacheError>,
}

impl LookupReport {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            snapshots: Vec::new(),
            messages: Vec::new(),
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The message shown once the lookup settled.
    pub fn final_message(&self) -> Option<&str> {
        self.messages.last().map(String::as_str)
    }
}

pub struct Harness<T>
where
    T: Transport + 'static,
{
    cache: QueryCache<T>,
    query: Query,
    policy: FetchPolicy,
}

impl<T> Harness<T>
where
    T: Transport + 'static,
{
    pub fn new(cache: QueryCache<T>, policy: FetchPolicy) -> Self {
        Self {
            cache,
            query: character_query(),
            policy,
        }
    }

    pub fn cache(&self) -> &QueryCache<T> {
        &self.cache
    }

    pub fn policy(&self) -> FetchPolicy {
        self.policy
    }

    pub async fn lookup(&self, id: &str) -> LookupReport {
        let span = info_span!("fetching", id = %id);
        self.lookup_inner(id).instrument(span).await
    }

    async fn lookup_inner(&self, id: &str) -> LookupReport {
        let variables = Variables::new().with("id", id);
        let key = self.query.key(&variables);
        let mut report = LookupReport::new(id);

        info!(policy = %self.policy, "Fetching id={}", id);
        let mut updates = std::pin::pin!(self.cache.fetch(&self.query, &variables, self.policy));

        while let Some(update) = updates.next().await {
            match update {
                Ok(snapshot) => {
                    let cached = self.cache.read(&key).is_complete();
                    let message = render_message(&snapshot);
                    info!(
                        loading = snapshot.loading,
                        network_status = %snapshot.network_status,
                        data = ?snapshot.data,
                        complete = snapshot.complete,
                        cached,
                        message = %message,
                        "Snapshot"
                    );
                    report.messages.push(message);
                    report.snapshots.push(snapshot);
                }
                Err(err) => {
                    error!(error = %err, "Lookup failed");
                    report.error = Some(err);
                }
            }
        }

        report
    }

    /// Look up every id in order. Failures do not stop later lookups.
    pub async fn run<I>(&self, ids: I) -> Vec<LookupReport>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut reports = Vec::new();
        for id in ids {
            reports.push(self.lookup(id.as_ref()).await);
        }
        reports
    }
}
