//! Navigation guard: the ordered checks run before every navigation.
//!
//! SYSTEM CONTEXT
//! ==============
//! The router calls `navigate` with the destination's descriptor and either
//! proceeds or follows the returned redirect. Route tables themselves live
//! with the router; this module only reads the three metadata flags.
//!
//! ORDER
//! =====
//! 1. availability gate (skipped for exempt routes)
//! 2. authentication gate (waits, bounded, for an in-progress auth check)
//! 3. pre-render re-validation: a forced probe right before commit
//!
//! The first gate that redirects ends the chain.

use std::sync::Arc;
use std::time::Duration;

use crate::availability::AvailabilityCache;
use crate::config::RedirectPaths;
use crate::session::SessionManager;

// =============================================================================
// ROUTES AND DECISIONS
// =============================================================================

/// Destination metadata supplied by the router.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteDescriptor {
    pub path: String,
    pub requires_auth: bool,
    pub guest_only: bool,
    pub bypass_availability: bool,
}

impl RouteDescriptor {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), ..Self::default() }
    }

    #[must_use]
    pub fn requiring_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    #[must_use]
    pub fn for_guests(mut self) -> Self {
        self.guest_only = true;
        self
    }

    #[must_use]
    pub fn exempt_from_availability(mut self) -> Self {
        self.bypass_availability = true;
        self
    }
}

/// Where to send the user instead of the requested destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: String,
    /// Human-readable reason, passed to the denial page as `message`.
    pub message: Option<String>,
}

impl Redirect {
    #[must_use]
    pub fn to(path: impl Into<String>) -> Self {
        Self { path: path.into(), message: None }
    }

    /// Location including the `message` query parameter, if any.
    #[must_use]
    pub fn href(&self) -> String {
        match &self.message {
            Some(message) => format!("{}?message={}", self.path, urlencoding::encode(message)),
            None => self.path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(Redirect),
}

impl GuardDecision {
    #[must_use]
    pub fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed)
    }
}

fn strip_query(path: &str) -> &str {
    path.split('?').next().unwrap_or_default()
}

// =============================================================================
// GUARD
// =============================================================================

#[derive(Clone)]
pub struct NavigationGuard {
    availability: AvailabilityCache,
    session: Arc<SessionManager>,
    paths: RedirectPaths,
    auth_wait: Duration,
}

impl NavigationGuard {
    /// `auth_wait` bounds how long the auth gate waits for an in-progress
    /// session check before deciding on whatever state is available.
    #[must_use]
    pub fn new(
        availability: AvailabilityCache,
        session: Arc<SessionManager>,
        paths: RedirectPaths,
        auth_wait: Duration,
    ) -> Self {
        Self { availability, session, paths, auth_wait }
    }

    /// Run the full chain for one navigation attempt.
    pub async fn navigate(&self, to: &RouteDescriptor) -> GuardDecision {
        let decision = self.availability_gate(to).await;
        if !decision.is_proceed() {
            return decision;
        }
        let decision = self.auth_gate(to).await;
        if !decision.is_proceed() {
            return decision;
        }
        self.revalidate(to).await
    }

    /// Gate 1. When the cache already believes the backend is degraded the
    /// probe is forced, so recovery is noticed on the next navigation.
    pub async fn availability_gate(&self, to: &RouteDescriptor) -> GuardDecision {
        if to.bypass_availability {
            return GuardDecision::Proceed;
        }
        let force = self.availability.current().is_active;
        let blocked = self.availability.ensure_availability(force).await;
        self.deny_if_blocked(to, blocked)
    }

    /// Gate 2.
    pub async fn auth_gate(&self, to: &RouteDescriptor) -> GuardDecision {
        let session = if self.session.is_loading() {
            self.session.wait_until_settled(self.auth_wait).await
        } else {
            self.session.current()
        };

        if to.requires_auth && !session.is_valid() {
            tracing::debug!(path = %to.path, "unauthenticated; redirecting to login");
            return GuardDecision::Redirect(self.login_redirect());
        }
        if to.guest_only && session.is_valid() {
            tracing::debug!(path = %to.path, "guest-only route; redirecting home");
            return GuardDecision::Redirect(Redirect::to(self.paths.home.clone()));
        }
        GuardDecision::Proceed
    }

    /// Gate 3: forced availability check immediately before commit.
    pub async fn revalidate(&self, to: &RouteDescriptor) -> GuardDecision {
        if to.bypass_availability {
            return GuardDecision::Proceed;
        }
        let blocked = self.availability.ensure_availability(true).await;
        self.deny_if_blocked(to, blocked)
    }

    #[must_use]
    pub fn login_redirect(&self) -> Redirect {
        Redirect::to(self.paths.login.clone())
    }

    fn is_denial_route(&self, to: &RouteDescriptor) -> bool {
        strip_query(&to.path) == self.paths.denial
    }

    fn deny_if_blocked(&self, to: &RouteDescriptor, blocked: bool) -> GuardDecision {
        if !blocked || self.is_denial_route(to) {
            return GuardDecision::Proceed;
        }
        let message = self.availability.current().message;
        tracing::info!(path = %to.path, %message, "backend degraded; redirecting to denial page");
        GuardDecision::Redirect(Redirect { path: self.paths.denial.clone(), message: Some(message) })
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
