//! GraphQL over HTTP.

use async_trait::async_trait;
use querycache_core::{NetworkError, Query, ResponseData, Transport, Variables};
use serde::Serialize;
use std::time::Duration;

use crate::config::DemoConfig;
use crate::error::ClientError;

/// Standard GraphQL POST body.
#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: &'a Variables,
    #[serde(rename = "operationName")]
    pub operation_name: &'a str,
}

impl<'a> GraphQlRequest<'a> {
    pub fn new(query: &'a Query, variables: &'a Variables) -> Self {
        Self {
            query: query.source(),
            variables,
            operation_name: query.id(),
        }
    }
}

/// Transport that POSTs queries to a single GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    timeout_ms: u64,
}

impl HttpTransport {
    pub fn new(config: &DemoConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim().to_string(),
            timeout_ms: config.request_timeout_ms,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_send_error(&self, err: reqwest::Error) -> NetworkError {
        if err.is_timeout() {
            NetworkError::Timeout {
                after_ms: self.timeout_ms,
            }
        } else {
            NetworkError::transport(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, query: &Query, variables: &Variables) -> Result<ResponseData, NetworkError> {
        let body = GraphQlRequest::new(query, variables);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            return Err(NetworkError::Status {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        decode_response(&bytes)
    }
}

/// Decode a GraphQL response body. Null top-level data is a failure.
pub fn decode_response(bytes: &[u8]) -> Result<ResponseData, NetworkError> {
    let response: ResponseData =
        serde_json::from_slice(bytes).map_err(|e| NetworkError::Decode {
            reason: e.to_string(),
        })?;

    match response.failure() {
        Some(err) => Err(err),
        None => Ok(response),
    }
}
