//! Availability cache: TTL-cached, single-flight view of the backend's
//! maintenance flag.
//!
//! DESIGN
//! ======
//! `AvailabilityState` lives in a `watch` channel written only by the probe
//! task. A fresh cached value (checked less than `window` ago) is returned
//! without touching the network. Otherwise callers join the in-flight probe if
//! there is one, or start it. The probe runs in its own spawned task so it
//! always settles and updates shared state, even if every waiting caller has
//! gone away.
//!
//! TRADE-OFFS
//! ==========
//! Anything short of an explicit `"ok"` is reported as blocked: a network
//! failure, a 503, an unknown status, an unparsable body. A brief false denial
//! is preferred over letting users act against a degraded backend.
//!
//! No timeout is applied to the probe itself. A hung probe keeps the in-flight
//! slot occupied, so later forced checks join it rather than starting another.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Deserialize;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::http::{AVAILABILITY_PATH, ApiRequest, ApiResponse, HttpTransport};

pub const MAINTENANCE_MESSAGE: &str = "Portal under maintenance.";
pub const SERVICE_UNAVAILABLE_MESSAGE: &str = "Service temporarily unavailable (503).";
pub const NETWORK_FAILURE_MESSAGE: &str = "Network error or server unavailable.";
const SERVER_ERROR_MESSAGE: &str = "Server error.";

// =============================================================================
// STATE
// =============================================================================

/// Latest known availability. `is_active == true` means degraded/blocked.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AvailabilityState {
    pub is_active: bool,
    pub message: String,
    /// `None` until the first probe settles.
    pub last_checked_at: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Unchecked,
    Fresh,
    Stale,
}

/// Interpreted probe result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub blocked: bool,
    pub message: String,
}

impl ProbeOutcome {
    fn available() -> Self {
        Self { blocked: false, message: String::new() }
    }

    fn blocked(message: impl Into<String>) -> Self {
        Self { blocked: true, message: message.into() }
    }

    /// Outcome when no response reached the client.
    #[must_use]
    pub fn unreachable() -> Self {
        Self::blocked(NETWORK_FAILURE_MESSAGE)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProbeBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Map a probe response onto available / blocked.
#[must_use]
pub fn interpret_probe(response: &ApiResponse) -> ProbeOutcome {
    let body: ProbeBody = serde_json::from_str(&response.body).unwrap_or_default();
    let message = body.message.filter(|m| !m.trim().is_empty());

    if response.status == 503 {
        return ProbeOutcome::blocked(message.unwrap_or_else(|| SERVICE_UNAVAILABLE_MESSAGE.to_owned()));
    }
    if !response.is_success() {
        let detail = message.unwrap_or_else(|| SERVER_ERROR_MESSAGE.to_owned());
        return ProbeOutcome::blocked(format!("Error {}: {detail}", response.status));
    }
    match body.status.as_deref() {
        Some("ok") => ProbeOutcome::available(),
        _ => ProbeOutcome::blocked(message.unwrap_or_else(|| MAINTENANCE_MESSAGE.to_owned())),
    }
}

// =============================================================================
// CACHE
// =============================================================================

type SharedProbe = Shared<BoxFuture<'static, bool>>;

/// Cloneable handle; all clones share one state and one in-flight slot.
#[derive(Clone)]
pub struct AvailabilityCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    transport: Arc<dyn HttpTransport>,
    state: watch::Sender<AvailabilityState>,
    in_flight: Mutex<Option<SharedProbe>>,
    window: Duration,
}

impl AvailabilityCache {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, window: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                transport,
                state: watch::Sender::new(AvailabilityState::default()),
                in_flight: Mutex::new(None),
                window,
            }),
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn current(&self) -> AvailabilityState {
        self.inner.state.borrow().clone()
    }

    /// Read-only reactive view of the state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AvailabilityState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.inner.window
    }

    #[must_use]
    pub fn freshness(&self) -> Freshness {
        match self.inner.state.borrow().last_checked_at {
            None => Freshness::Unchecked,
            Some(at) if at.elapsed() < self.inner.window => Freshness::Fresh,
            Some(_) => Freshness::Stale,
        }
    }

    /// Whether an availability probe is currently outstanding.
    #[must_use]
    pub fn probe_in_flight(&self) -> bool {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Return `true` if the backend is blocked/degraded.
    ///
    /// Uses the cached value when fresh and `force_refresh` is false;
    /// otherwise joins or starts the single outstanding probe.
    pub async fn ensure_availability(&self, force_refresh: bool) -> bool {
        if !force_refresh {
            if let Some(cached) = self.fresh_value() {
                tracing::debug!(blocked = cached, "availability cache hit");
                return cached;
            }
        }
        self.join_or_start_probe().await
    }

    fn fresh_value(&self) -> Option<bool> {
        let state = self.inner.state.borrow();
        match state.last_checked_at {
            Some(at) if at.elapsed() < self.inner.window => Some(state.is_active),
            _ => None,
        }
    }

    fn join_or_start_probe(&self) -> SharedProbe {
        let mut slot = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(probe) = slot.as_ref() {
            tracing::debug!("joining in-flight availability probe");
            return probe.clone();
        }

        // Spawned while the slot is locked, so the task cannot release the
        // slot before the probe handle is stored in it.
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.run_probe().await });
        let probe = async move {
            task.await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "availability probe task failed; treating as blocked");
                true
            })
        }
        .boxed()
        .shared();

        *slot = Some(probe.clone());
        probe
    }
}

impl CacheInner {
    async fn run_probe(&self) -> bool {
        let outcome = match self.transport.send(&ApiRequest::get(AVAILABILITY_PATH)).await {
            Ok(response) => interpret_probe(&response),
            Err(e) => {
                tracing::warn!(error = %e, "availability probe unreachable");
                ProbeOutcome::unreachable()
            }
        };

        let blocked = outcome.blocked;
        self.state.send_modify(|s| {
            if s.is_active != blocked {
                if blocked {
                    tracing::info!(message = %outcome.message, "backend reported degraded");
                } else {
                    tracing::info!("backend available");
                }
            }
            s.is_active = blocked;
            s.message = outcome.message;
            s.last_checked_at = Some(Instant::now());
        });

        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        blocked
    }
}

#[cfg(test)]
#[path = "availability_test.rs"]
mod tests;
