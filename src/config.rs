//! Guard configuration parsed from environment variables.

use std::time::Duration;

use crate::error::ApiError;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_AVAILABILITY_WINDOW_SECS: u64 = 300;
pub const DEFAULT_AUTH_WAIT_MS: u64 = 3000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 0;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SESSION_COOKIES: &str =
    "access_token_cookie,refresh_token_cookie,csrf_access_token,csrf_refresh_token,session";
pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_HOME_PATH: &str = "/";
pub const DEFAULT_DENIAL_PATH: &str = "/maintenance";

/// HTTP timeouts. A zero request timeout means requests never time out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// Where the navigation guard sends redirected users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectPaths {
    pub login: String,
    pub home: String,
    pub denial: String,
}

impl Default for RedirectPaths {
    fn default() -> Self {
        Self {
            login: DEFAULT_LOGIN_PATH.to_owned(),
            home: DEFAULT_HOME_PATH.to_owned(),
            denial: DEFAULT_DENIAL_PATH.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    pub api_url: String,
    pub availability_window: Duration,
    pub auth_wait: Duration,
    pub timeouts: HttpTimeouts,
    pub session_cookies: Vec<String>,
    pub paths: RedirectPaths,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            availability_window: Duration::from_secs(DEFAULT_AVAILABILITY_WINDOW_SECS),
            auth_wait: Duration::from_millis(DEFAULT_AUTH_WAIT_MS),
            timeouts: HttpTimeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            session_cookies: parse_cookie_names(DEFAULT_SESSION_COOKIES),
            paths: RedirectPaths::default(),
        }
    }
}

impl GuardConfig {
    /// Build typed guard config from environment variables.
    ///
    /// Optional:
    /// - `PORTAL_API_URL`: backend base URL, default `http://127.0.0.1:5000`
    /// - `PORTAL_AVAILABILITY_WINDOW_SECS`: default 300
    /// - `PORTAL_AUTH_WAIT_MS`: default 3000
    /// - `PORTAL_REQUEST_TIMEOUT_SECS`: default 0 (no timeout)
    /// - `PORTAL_CONNECT_TIMEOUT_SECS`: default 10
    /// - `PORTAL_SESSION_COOKIES`: comma-separated cookie names
    /// - `PORTAL_LOGIN_PATH`, `PORTAL_HOME_PATH`, `PORTAL_DENIAL_PATH`
    ///
    /// # Errors
    ///
    /// Returns `ApiError::ConfigParse` for a malformed URL or number.
    pub fn from_env() -> Result<Self, ApiError> {
        let api_url = parse_api_url(&std::env::var("PORTAL_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_owned()))?;
        let window_secs = env_parse_u64("PORTAL_AVAILABILITY_WINDOW_SECS", DEFAULT_AVAILABILITY_WINDOW_SECS)?;
        let auth_wait_ms = env_parse_u64("PORTAL_AUTH_WAIT_MS", DEFAULT_AUTH_WAIT_MS)?;
        let timeouts = HttpTimeouts {
            request_secs: env_parse_u64("PORTAL_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: env_parse_u64("PORTAL_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };
        let session_cookies = parse_cookie_names(
            &std::env::var("PORTAL_SESSION_COOKIES").unwrap_or_else(|_| DEFAULT_SESSION_COOKIES.to_owned()),
        );
        let paths = RedirectPaths {
            login: std::env::var("PORTAL_LOGIN_PATH").unwrap_or_else(|_| DEFAULT_LOGIN_PATH.to_owned()),
            home: std::env::var("PORTAL_HOME_PATH").unwrap_or_else(|_| DEFAULT_HOME_PATH.to_owned()),
            denial: std::env::var("PORTAL_DENIAL_PATH").unwrap_or_else(|_| DEFAULT_DENIAL_PATH.to_owned()),
        };

        Ok(Self {
            api_url,
            availability_window: Duration::from_secs(window_secs),
            auth_wait: Duration::from_millis(auth_wait_ms),
            timeouts,
            session_cookies,
            paths,
        })
    }

    /// Replace the base URL, applying the same validation as `from_env`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::ConfigParse` if the URL has no http(s) scheme.
    pub fn with_api_url(mut self, raw: &str) -> Result<Self, ApiError> {
        self.api_url = parse_api_url(raw)?;
        Ok(self)
    }
}

fn env_parse_u64(key: &str, default: u64) -> Result<u64, ApiError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ApiError::ConfigParse(format!("{key} must be a non-negative integer, got '{raw}'"))),
        Err(_) => Ok(default),
    }
}

pub(crate) fn parse_api_url(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ApiError::ConfigParse(format!("PORTAL_API_URL must start with http:// or https://, got '{raw}'")));
    }
    Ok(trimmed.to_owned())
}

fn parse_cookie_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
