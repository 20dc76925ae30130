//! reqwest-backed transport with a shared cookie jar.
//!
//! The jar plays the browser's role: session cookies set by `/auth/*` are
//! replayed on every request, which is what "credential-bearing" means here.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use reqwest::cookie::Jar;

use super::{ApiRequest, ApiResponse, HttpTransport, Method};
use crate::config::HttpTimeouts;
use crate::error::ApiError;

pub struct ReqwestTransport {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base_url: Url,
}

impl ReqwestTransport {
    /// Build a transport rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::ConfigParse` for an unparsable URL and
    /// `ApiError::HttpClientBuild` if the reqwest client fails to build.
    pub fn new(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::ConfigParse(format!("invalid API URL: {e}")))?;
        let jar = Arc::new(Jar::default());

        let mut builder = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs));
        if timeouts.request_secs > 0 {
            builder = builder.timeout(Duration::from_secs(timeouts.request_secs));
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;

        Ok(Self { http, jar, base_url })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// `Set-Cookie` value that removes `name` from the jar.
pub(crate) fn expired_cookie(name: &str) -> String {
    format!("{name}=; Max-Age=0; Path=/")
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut builder = self
            .http
            .request(reqwest_method(request.method), self.url_for(&request.path));
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        tracing::debug!(path = %request.path, status, "backend response");
        Ok(ApiResponse { status, body })
    }

    fn expire_cookies(&self, names: &[String]) {
        for name in names {
            self.jar.add_cookie_str(&expired_cookie(name), &self.base_url);
        }
    }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
