//! GraphQL response payloads as returned by a transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::NetworkError;

/// A single entry of a GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Value>,
}

impl GraphQlError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
        }
    }
}

/// Body of a GraphQL response.
///
/// `data` may be partial. When `errors` is non-empty alongside non-null
/// data, the server resolved some fields and gave up on others.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseData {
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQlError>,
}

impl ResponseData {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            errors: Vec::new(),
        }
    }

    pub fn with_errors(data: Value, errors: Vec<GraphQlError>) -> Self {
        Self { data, errors }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether the server resolved nothing. Null top-level data is a
    /// failure with or without an `errors` array.
    pub fn is_failure(&self) -> bool {
        self.data.is_null()
    }

    /// The error a failed response surfaces as, if it failed.
    pub fn failure(&self) -> Option<NetworkError> {
        if !self.is_failure() {
            return None;
        }
        let mut messages = self.error_messages();
        if messages.is_empty() {
            messages.push("response carried no data".to_string());
        }
        Some(NetworkError::GraphQl { messages })
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message.clone()).collect()
    }
}
