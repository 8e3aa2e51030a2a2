//! querycache Test Utilities
//!
//! Centralized test infrastructure for the querycache workspace:
//! - Scripted mock transport with call counting and a request gate
//! - Fixtures for the character lookup scenario
//! - Proptest generators for variables and JSON values

// Re-export core types for convenience
pub use querycache_core::{
    CacheError, CacheKey, CacheRead, FetchPolicy, GraphQlError, NetworkError, NetworkStatus,
    Query, QuerySnapshot, ResponseData, Transport, Variables,
};

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

// ============================================================================
// MOCK TRANSPORT
// ============================================================================

/// Holds gated requests until permits are released.
#[derive(Debug, Clone)]
pub struct Gate {
    permits: Arc<Semaphore>,
}

impl Gate {
    fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(0)),
        }
    }

    /// Let `n` held or future requests through.
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }

    async fn pass(&self) {
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

/// Mock transport answering by the `id` variable.
///
/// Unknown ids answer `{"character": null}`, like a server that found
/// nothing. Every call is counted, including failed ones.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, ResponseData>>,
    failures: Mutex<HashMap<String, NetworkError>>,
    calls: AtomicUsize,
    calls_by_id: Mutex<HashMap<String, usize>>,
    gate: Option<Gate>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose requests block until the returned gate releases them.
    pub fn gated() -> (Self, Gate) {
        let gate = Gate::new();
        let transport = Self {
            gate: Some(gate.clone()),
            ..Self::default()
        };
        (transport, gate)
    }

    /// Builder-style: answer `id` with `data`.
    pub fn with_response(self, id: &str, data: Value) -> Self {
        self.respond(id, ResponseData::new(data));
        self
    }

    /// Replace the answer for `id`.
    pub fn respond(&self, id: &str, response: ResponseData) {
        self.responses
            .lock()
            .unwrap()
            .insert(id.to_string(), response);
    }

    /// Make every request for `id` fail with `error` until cleared.
    pub fn fail(&self, id: &str, error: NetworkError) {
        self.failures.lock().unwrap().insert(id.to_string(), error);
    }

    pub fn clear_failure(&self, id: &str) {
        self.failures.lock().unwrap().remove(id);
    }

    /// Total number of `send` calls.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of `send` calls for a given id.
    pub fn calls_for(&self, id: &str) -> usize {
        self.calls_by_id
            .lock()
            .unwrap()
            .get(id)
            .copied()
            .unwrap_or(0)
    }
}

/// Render the `id` variable as a plain string.
pub fn id_of(variables: &Variables) -> String {
    match variables.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, _query: &Query, variables: &Variables) -> Result<ResponseData, NetworkError> {
        let id = id_of(variables);
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls_by_id
            .lock()
            .unwrap()
            .entry(id.clone())
            .or_insert(0) += 1;

        if let Some(gate) = &self.gate {
            gate.pass().await;
        }

        if let Some(error) = self.failures.lock().unwrap().get(&id).cloned() {
            return Err(error);
        }

        let response = self
            .responses
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| ResponseData::new(json!({"character": null})));
        Ok(response)
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Document text of the character lookup query.
pub const CHARACTER_QUERY: &str = "query Debug($id: ID!) { character(id: $id) { name } }";

/// The character lookup query with its requested fields declared.
pub fn character_query() -> Query {
    Query::new("Debug", CHARACTER_QUERY)
        .require("character")
        .require("character.name")
}

pub fn character_vars(id: &str) -> Variables {
    Variables::new().with("id", id)
}

/// Complete payload for a named character.
pub fn character(name: &str) -> Value {
    json!({"character": {"name": name}})
}

pub fn rick() -> Value {
    character("Rick")
}

/// Payload that resolves `character` but not `character.name`.
pub fn partial_character() -> Value {
    json!({"character": {}})
}

/// Mock transport that knows ids 1000 (Rick) and 2001 (Morty).
pub fn demo_transport() -> MockTransport {
    MockTransport::new()
        .with_response("1000", rick())
        .with_response("2001", character("Morty"))
}

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    /// JSON scalars, excluding floats so equality is total.
    pub fn arb_json_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z0-9]{0,10}".prop_map(Value::from),
        ]
    }

    /// Nested JSON values up to a small depth.
    pub fn arb_json_value() -> impl Strategy<Value = Value> {
        arb_json_scalar().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    /// Variable entries with unique names.
    pub fn arb_variable_entries() -> impl Strategy<Value = Vec<(String, Value)>> {
        prop::collection::btree_map("[a-z]{1,6}", arb_json_value(), 0..6)
            .prop_map(|m| m.into_iter().collect())
    }

    pub fn arb_variables() -> impl Strategy<Value = Variables> {
        arb_variable_entries().prop_map(|entries| entries.into_iter().collect())
    }

    /// Numeric character ids as strings.
    pub fn arb_character_id() -> impl Strategy<Value = String> {
        (1u32..100_000).prop_map(|n| n.to_string())
    }

    /// Character names that always resolve `character.name`.
    pub fn arb_character_name() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{1,10}"
    }
}
