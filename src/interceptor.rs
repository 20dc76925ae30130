//! Refresh-and-retry-once on 401.
//!
//! Installed as the outermost middleware of `ApiClient`. A 401 on any request
//! other than the refresh call itself triggers one refresh; on success the
//! original request is replayed once, on failure the local session is cleared
//! and the 401 is returned unchanged. There is no second retry.

use std::sync::Arc;

use crate::error::ApiError;
use crate::http::{ApiRequest, ApiResponse, Middleware, Next, REFRESH_PATH};
use crate::session::SessionManager;

pub struct RefreshOnUnauthorized {
    session: Arc<SessionManager>,
}

impl RefreshOnUnauthorized {
    #[must_use]
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }
}

#[async_trait::async_trait]
impl Middleware for RefreshOnUnauthorized {
    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse, ApiError> {
        let response = next.run(request.clone()).await?;
        if !response.is_unauthorized() || request.targets(REFRESH_PATH) {
            return Ok(response);
        }

        if self.session.refresh_token().await {
            tracing::debug!(path = %request.path, "retrying request after refresh");
            next.run(request).await
        } else {
            tracing::info!(path = %request.path, "refresh failed after 401; clearing session");
            self.session.clear();
            Ok(response)
        }
    }
}

#[cfg(test)]
#[path = "interceptor_test.rs"]
mod tests;
