//! Query identity, variables, and cache keys.
//!
//! The cache never parses GraphQL. Callers describe each query shape with a
//! stable identifier plus the field paths it requests, and the cache uses
//! those paths to decide whether a stored result is complete.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ============================================================================
// FIELD PATHS
// ============================================================================

/// A dot-separated path into a result payload, e.g. `character.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Parse a dotted path. Empty segments are ignored.
    pub fn parse(path: &str) -> Self {
        Self(
            path.split('.')
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Check whether `value` resolves this path.
    ///
    /// A present key resolves, including an explicit `null`, which also
    /// resolves everything beneath it. Arrays resolve only when every
    /// element resolves the remainder of the path.
    pub fn is_resolved_by(&self, value: &Value) -> bool {
        resolves(value, &self.0)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

fn resolves(value: &Value, path: &[String]) -> bool {
    let Some((head, rest)) = path.split_first() else {
        return true;
    };
    match value {
        Value::Null => true,
        Value::Object(fields) => fields
            .get(head)
            .is_some_and(|child| resolves(child, rest)),
        Value::Array(items) => items.iter().all(|item| resolves(item, path)),
        _ => false,
    }
}

// ============================================================================
// QUERY
// ============================================================================

/// Caller-supplied description of one query shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    id: String,
    source: String,
    required: Vec<FieldPath>,
}

impl Query {
    /// Create a query with a stable identifier and its document text.
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            required: Vec::new(),
        }
    }

    /// Declare a field path this query requests.
    pub fn require(mut self, path: &str) -> Self {
        let path = FieldPath::parse(path);
        if !path.segments().is_empty() && !self.required.contains(&path) {
            self.required.push(path);
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn required(&self) -> &[FieldPath] {
        &self.required
    }

    /// Build the cache key for this query under `variables`.
    pub fn key(&self, variables: &Variables) -> CacheKey {
        CacheKey::new(&self.id, variables)
    }

    /// Whether `data` resolves every requested field.
    ///
    /// `null` data is never complete. With no declared paths, any other
    /// payload is.
    pub fn is_complete(&self, data: &Value) -> bool {
        !data.is_null() && self.required.iter().all(|path| path.is_resolved_by(data))
    }
}

// ============================================================================
// VARIABLES
// ============================================================================

/// Variable name to value mapping for a single query execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables(Map<String, Value>);

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Render the variables with object keys sorted at every depth.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        write_canonical_object(&self.0, &mut out);
        out
    }
}

impl From<Map<String, Value>> for Variables {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut variables = Self::new();
        for (name, value) in iter {
            variables.insert(name, value);
        }
        variables
    }
}

fn write_canonical_object(fields: &Map<String, Value>, out: &mut String) {
    let mut sorted: Vec<(&String, &Value)> = fields.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    out.push('{');
    for (i, (name, value)) in sorted.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&Value::String(name.clone()).to_string());
        out.push(':');
        write_canonical(value, out);
    }
    out.push('}');
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(fields) => write_canonical_object(fields, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

// ============================================================================
// CACHE KEY
// ============================================================================

/// Composite identity of a query plus its variables.
///
/// Two keys are equal when the query ids match and the variable mappings
/// are structurally equal, regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    query_id: String,
    variables: String,
}

impl CacheKey {
    pub fn new(query_id: &str, variables: &Variables) -> Self {
        Self {
            query_id: query_id.to_string(),
            variables: variables.canonical(),
        }
    }

    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    /// Canonical JSON rendering of the variables.
    pub fn variables(&self) -> &str {
        &self.variables
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.query_id, self.variables)
    }
}
