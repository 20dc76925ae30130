//! Error taxonomy for backend calls.
//!
//! DESIGN
//! ======
//! Only the transport and `ApiClient` surface return `ApiError`. The session
//! manager, availability cache and navigation guard absorb every variant into
//! a defined state (unauthenticated / blocked) and log it instead.

/// Stable machine-readable code attached to an error.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Errors produced by backend requests and configuration.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No response reached the client.
    #[error("network failure: {0}")]
    Network(String),

    /// The backend answered 401.
    #[error("unauthorized")]
    Unauthorized,

    /// The backend answered 503 or reported a non-"ok" status.
    #[error("service degraded: {message}")]
    ServiceDegraded { message: String },

    /// Any other non-2xx status.
    #[error("unexpected status {status}")]
    UnexpectedStatus { status: u16, body: String },

    /// A response body could not be deserialized.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),
}

impl ApiError {
    /// Classify a non-2xx response.
    #[must_use]
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => Self::Unauthorized,
            503 => Self::ServiceDegraded { message: body },
            _ => Self::UnexpectedStatus { status, body },
        }
    }
}

impl ErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Network(_) => "E_NETWORK",
            Self::Unauthorized => "E_UNAUTHORIZED",
            Self::ServiceDegraded { .. } => "E_SERVICE_DEGRADED",
            Self::UnexpectedStatus { .. } => "E_UNEXPECTED_STATUS",
            Self::Decode(_) => "E_DECODE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::ServiceDegraded { .. } | Self::UnexpectedStatus { status: 429 | 500..=599, .. }
        )
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
