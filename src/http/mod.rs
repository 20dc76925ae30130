//! HTTP layer: request/response types, the transport seam, and the
//! middleware-driven `ApiClient`.
//!
//! DESIGN
//! ======
//! Every backend call goes through an `HttpTransport`. The session manager and
//! availability cache talk to the transport directly; application requests go
//! through `ApiClient`, which runs an ordered middleware list first. Nothing
//! patches a shared global request function.

pub mod middleware;
pub mod transport;

pub use middleware::{ApiClient, Middleware, Next};
pub use transport::ReqwestTransport;

use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub const IDENTITY_PATH: &str = "/auth/me";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const AVAILABILITY_PATH: &str = "/api/handler/";

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// An outbound request relative to the configured API base URL.
///
/// `Clone` so the refresh interceptor can replay it once.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self { method: Method::Get, path: path.into(), body: None }
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self { method: Method::Post, path: path.into(), body: None }
    }

    #[must_use]
    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// True when this request targets `path`, ignoring any query string and
    /// a trailing slash.
    #[must_use]
    pub fn targets(&self, path: &str) -> bool {
        let own = self.path.split('?').next().unwrap_or_default();
        own.trim_end_matches('/') == path.trim_end_matches('/')
    }
}

/// A fully-read backend response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Decode` if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Convert a non-2xx response into its `ApiError` class.
    ///
    /// # Errors
    ///
    /// Returns the classified error for any non-2xx status.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() { Ok(self) } else { Err(ApiError::from_status(self.status, self.body)) }
    }
}

// =============================================================================
// TRANSPORT SEAM
// =============================================================================

/// Credential-bearing HTTP transport.
///
/// `send` returns `Err(ApiError::Network)` only when no response arrived; any
/// response, whatever its status, is `Ok`.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;

    /// Locally expire the named cookies so they are no longer sent.
    fn expire_cookies(&self, names: &[String]);
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
