//! Ordered middleware chain in front of an `HttpTransport`.
//!
//! Each middleware receives the request and a `Next` cursor; calling
//! `next.run(request)` hands off to the following middleware, and the last
//! one reaches the transport. A middleware may call `next.run` more than once
//! (the refresh interceptor replays a request after a 401).

use std::sync::Arc;

use super::{ApiRequest, ApiResponse, HttpTransport};
use crate::error::ApiError;

#[async_trait::async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse, ApiError>;
}

/// Cursor over the remaining middleware list.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    remaining: &'a [Arc<dyn Middleware>],
    transport: &'a dyn HttpTransport,
}

impl Next<'_> {
    /// Run the rest of the chain for `request`.
    ///
    /// # Errors
    ///
    /// Propagates whatever the downstream middleware or transport returns.
    pub async fn run(self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        match self.remaining.split_first() {
            Some((head, tail)) => {
                let next = Next { remaining: tail, transport: self.transport };
                head.handle(request, next).await
            }
            None => self.transport.send(&request).await,
        }
    }
}

/// Application-facing HTTP client.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl ApiClient {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport, middleware: Vec::new() }
    }

    /// Append a middleware; earlier layers see the request first.
    #[must_use]
    pub fn with(mut self, layer: Arc<dyn Middleware>) -> Self {
        self.middleware.push(layer);
        self
    }

    /// Send a request through the chain and return the raw response.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` when no response arrived.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let next = Next { remaining: &self.middleware, transport: self.transport.as_ref() };
        next.run(request).await
    }

    /// Send a request and decode a 2xx JSON body.
    ///
    /// # Errors
    ///
    /// Returns the classified `ApiError` for non-2xx statuses, or
    /// `ApiError::Decode` for an unexpected body.
    pub async fn json<T: serde::de::DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.send(request).await?.error_for_status()?.json()
    }
}

#[cfg(test)]
#[path = "middleware_test.rs"]
mod tests;
