//! Composition root for the guard subsystems.
//!
//! DESIGN
//! ======
//! `PortalContext` owns one session manager, one availability cache and the
//! navigation guard built from them, and hands out an `ApiClient` whose
//! middleware chain carries the refresh interceptor. Routing and view code get
//! these handles injected; nothing here is a global.
//! Clone is cheap: all fields are Arc-wrapped or Clone.

use std::sync::Arc;

use crate::availability::AvailabilityCache;
use crate::config::GuardConfig;
use crate::error::ApiError;
use crate::guard::{NavigationGuard, Redirect};
use crate::http::{ApiClient, HttpTransport, ReqwestTransport};
use crate::interceptor::RefreshOnUnauthorized;
use crate::session::SessionManager;

#[derive(Clone)]
pub struct PortalContext {
    pub session: Arc<SessionManager>,
    pub availability: AvailabilityCache,
    pub guard: NavigationGuard,
    pub client: ApiClient,
}

impl PortalContext {
    /// Build the context with a reqwest transport rooted at `config.api_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client fails
    /// to build.
    pub fn from_config(config: &GuardConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(&config.api_url, config.timeouts)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build the context over an arbitrary transport.
    #[must_use]
    pub fn with_transport(config: &GuardConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let session = Arc::new(SessionManager::new(Arc::clone(&transport), config.session_cookies.clone()));
        let availability = AvailabilityCache::new(Arc::clone(&transport), config.availability_window);
        let guard = NavigationGuard::new(
            availability.clone(),
            Arc::clone(&session),
            config.paths.clone(),
            config.auth_wait,
        );
        let client = ApiClient::new(transport).with(Arc::new(RefreshOnUnauthorized::new(Arc::clone(&session))));

        Self { session, availability, guard, client }
    }

    /// Application start: derive the session once.
    pub async fn start(&self) {
        self.session.check_auth().await;
    }

    /// Log out and return where the user should be sent.
    pub async fn logout_and_redirect(&self) -> Redirect {
        self.session.logout().await;
        self.guard.login_redirect()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::error::ApiError;
    use crate::http::{ApiRequest, ApiResponse, HttpTransport};

    /// One scripted reply for a path.
    #[derive(Debug, Clone)]
    pub struct Reply {
        outcome: Result<ApiResponse, String>,
        delay: Option<Duration>,
    }

    impl Reply {
        pub fn status(status: u16, body: &str) -> Self {
            Self { outcome: Ok(ApiResponse::new(status, body)), delay: None }
        }

        pub fn json(status: u16, body: serde_json::Value) -> Self {
            Self::status(status, &body.to_string())
        }

        pub fn network_error() -> Self {
            Self { outcome: Err("connection refused".into()), delay: None }
        }

        /// Hold the reply back for `delay` (tokio time, so pausable).
        pub fn after(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    /// Transport that answers from per-path reply queues and records calls.
    ///
    /// The last reply in a queue is sticky: it answers every later call.
    /// Paths with no script answer 404.
    #[derive(Default)]
    pub struct ScriptedTransport {
        replies: Mutex<HashMap<String, VecDeque<Reply>>>,
        calls: Mutex<Vec<ApiRequest>>,
        expired: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on(self, path: &str, reply: Reply) -> Self {
            self.push(path, reply);
            self
        }

        pub fn push(&self, path: &str, reply: Reply) {
            self.replies
                .lock()
                .unwrap()
                .entry(path.to_owned())
                .or_default()
                .push_back(reply);
        }

        pub fn calls(&self) -> Vec<ApiRequest> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_to(&self, path: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.path == path)
                .count()
        }

        pub fn expired_cookies(&self) -> Vec<String> {
            self.expired.lock().unwrap().clone()
        }

        fn next_reply(&self, path: &str) -> Reply {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(path) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
                Some(queue) if !queue.is_empty() => queue[0].clone(),
                _ => Reply::status(404, ""),
            }
        }
    }

    #[async_trait::async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
            self.calls.lock().unwrap().push(request.clone());
            let reply = self.next_reply(&request.path);
            if let Some(delay) = reply.delay {
                tokio::time::sleep(delay).await;
            }
            reply.outcome.map_err(ApiError::Network)
        }

        fn expire_cookies(&self, names: &[String]) {
            self.expired.lock().unwrap().extend_from_slice(names);
        }
    }

    pub fn user_json(id: i64, email: &str) -> serde_json::Value {
        serde_json::json!({ "id": id, "email": email, "first_name": "Ana", "last_name": null })
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
