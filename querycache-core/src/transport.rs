//! Transport capability consumed by the cache.

use async_trait::async_trait;
use std::sync::Arc;

use crate::{NetworkError, Query, ResponseData, Variables};

/// Sends a query to whatever backend answers it.
///
/// Supplied by the caller. The cache never constructs its own transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute `query` with `variables` and return the response body.
    async fn send(&self, query: &Query, variables: &Variables) -> Result<ResponseData, NetworkError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, query: &Query, variables: &Variables) -> Result<ResponseData, NetworkError> {
        (**self).send(query, variables).await
    }
}
