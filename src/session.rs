//! Session manager: current-user state against a cookie-based backend.
//!
//! ARCHITECTURE
//! ============
//! `Session` lives in a `watch` channel owned by the manager. Callers get a
//! snapshot (`current`) or a receiver (`subscribe`); only the manager writes.
//! The same channel doubles as the completion signal the navigation guard
//! awaits while a derivation is in progress.
//!
//! ERROR HANDLING
//! ==============
//! No operation returns an error. Network failures, unexpected statuses and
//! undecodable identity bodies all resolve to the cleared session
//! (`user = None`, `is_authenticated = false`) plus a `warn!` event.
//!
//! TRADE-OFFS
//! ==========
//! A 401 from the identity endpoint triggers exactly one refresh followed by
//! exactly one more identity fetch. A second 401 clears the session instead of
//! refreshing again, so a permanently invalid session cannot loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::ApiError;
use crate::http::{ApiRequest, HttpTransport, IDENTITY_PATH, LOGOUT_PATH, REFRESH_PATH};

// =============================================================================
// STATE
// =============================================================================

/// User record returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(alias = "user_id")]
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl UserRecord {
    /// Full name when known, otherwise the email address.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            _ => self.email.clone(),
        }
    }
}

/// Authentication state for the current client.
///
/// `is_authenticated` implies `user.is_some()`; the manager never writes one
/// without the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: Option<UserRecord>,
    pub is_authenticated: bool,
    pub loading: bool,
}

impl Session {
    /// State at application start: nothing known yet, derivation pending.
    #[must_use]
    pub fn initial() -> Self {
        Self { user: None, is_authenticated: false, loading: true }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_authenticated && self.user.is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::initial()
    }
}

enum IdentityOutcome {
    Authenticated(UserRecord),
    Unauthorized,
    Failed(ApiError),
}

// =============================================================================
// LOADING GUARD
// =============================================================================

/// Holds `loading = true` for the lifetime of one `check_auth` call.
///
/// Dropping the last outstanding guard publishes `loading = false`, on every
/// exit path including early returns and panics.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<Session>,
    derivations: &'a AtomicUsize,
}

impl<'a> LoadingGuard<'a> {
    fn begin(state: &'a watch::Sender<Session>, derivations: &'a AtomicUsize) -> Self {
        derivations.fetch_add(1, Ordering::SeqCst);
        state.send_if_modified(|s| !std::mem::replace(&mut s.loading, true));
        Self { state, derivations }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.derivations.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.state.send_modify(|s| s.loading = false);
        }
    }
}

// =============================================================================
// SESSION MANAGER
// =============================================================================

pub struct SessionManager {
    transport: Arc<dyn HttpTransport>,
    state: watch::Sender<Session>,
    derivations: AtomicUsize,
    session_cookies: Vec<String>,
}

impl SessionManager {
    /// Create a manager in the initial (`loading`) state.
    ///
    /// `session_cookies` names the cookies expired locally on logout.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, session_cookies: Vec<String>) -> Self {
        Self {
            transport,
            state: watch::Sender::new(Session::initial()),
            derivations: AtomicUsize::new(0),
            session_cookies,
        }
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn current(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Read-only reactive view of the session.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    #[must_use]
    pub fn has_valid_session(&self) -> bool {
        self.state.borrow().is_valid()
    }

    /// Re-derive the session from the identity endpoint.
    ///
    /// On 401 performs one refresh and, if it succeeds, one more identity
    /// fetch. Every other failure clears the session.
    pub async fn check_auth(&self) {
        let _loading = LoadingGuard::begin(&self.state, &self.derivations);

        let outcome = match self.fetch_identity().await {
            IdentityOutcome::Unauthorized => self.identity_after_refresh().await,
            other => other,
        };

        match outcome {
            IdentityOutcome::Authenticated(user) => {
                tracing::info!(user_id = user.id, "session authenticated");
                self.state.send_modify(|s| {
                    s.user = Some(user);
                    s.is_authenticated = true;
                });
            }
            IdentityOutcome::Unauthorized => {
                tracing::info!("no valid session after refresh");
                self.clear();
            }
            IdentityOutcome::Failed(e) => {
                tracing::warn!(error = %e, "auth check failed; clearing session");
                self.clear();
            }
        }
    }

    /// Run `check_auth` only if no user is known and none is in progress.
    ///
    /// Returns whether a check was started.
    pub async fn check_auth_if_idle(&self) -> bool {
        let idle = {
            let s = self.state.borrow();
            s.user.is_none() && !s.loading
        };
        if idle {
            self.check_auth().await;
        }
        idle
    }

    /// Ask the backend to rotate credentials. Never fails; errors become `false`.
    pub async fn refresh_token(&self) -> bool {
        match self.transport.send(&ApiRequest::post(REFRESH_PATH)).await {
            Ok(resp) if resp.is_success() => {
                tracing::debug!("session refreshed");
                true
            }
            Ok(resp) => {
                tracing::warn!(status = resp.status, "session refresh rejected");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "session refresh failed");
                false
            }
        }
    }

    /// Log out remotely and clear local state unconditionally.
    ///
    /// Returns whether the remote call succeeded; local state and session
    /// cookies are cleared either way.
    pub async fn logout(&self) -> bool {
        let remote_ok = match self.transport.send(&ApiRequest::post(LOGOUT_PATH)).await {
            Ok(resp) if resp.is_success() => true,
            Ok(resp) => {
                tracing::warn!(status = resp.status, "logout rejected by backend");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "logout request failed");
                false
            }
        };

        self.clear();
        self.transport.expire_cookies(&self.session_cookies);
        tracing::info!(remote_ok, "logged out");
        remote_ok
    }

    /// Wait for any in-progress derivation, up to `max_wait`, then return the
    /// session as it stands.
    pub async fn wait_until_settled(&self, max_wait: Duration) -> Session {
        let mut rx = self.state.subscribe();
        let settled = tokio::time::timeout(max_wait, rx.wait_for(|s| !s.loading))
            .await
            .is_ok();
        if !settled {
            tracing::warn!(?max_wait, "auth still loading; proceeding with current state");
        }
        self.current()
    }

    /// Drop the user and mark the session unauthenticated.
    pub(crate) fn clear(&self) {
        self.state.send_if_modified(|s| {
            let changed = s.user.is_some() || s.is_authenticated;
            s.user = None;
            s.is_authenticated = false;
            changed
        });
    }

    async fn identity_after_refresh(&self) -> IdentityOutcome {
        if self.refresh_token().await {
            self.fetch_identity().await
        } else {
            IdentityOutcome::Unauthorized
        }
    }

    async fn fetch_identity(&self) -> IdentityOutcome {
        match self.transport.send(&ApiRequest::get(IDENTITY_PATH)).await {
            Ok(resp) if resp.is_success() => match resp.json::<UserRecord>() {
                Ok(user) => IdentityOutcome::Authenticated(user),
                Err(e) => IdentityOutcome::Failed(e),
            },
            Ok(resp) if resp.is_unauthorized() => IdentityOutcome::Unauthorized,
            Ok(resp) => IdentityOutcome::Failed(ApiError::from_status(resp.status, resp.body)),
            Err(e) => IdentityOutcome::Failed(e),
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
