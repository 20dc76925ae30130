//! Session and availability guard for the tourist-sites portal.
//!
//! ARCHITECTURE
//! ============
//! - `session`: current-user state, identity checks, refresh and logout.
//! - `availability`: TTL-cached, single-flight maintenance-mode probe.
//! - `guard`: ordered availability/auth/re-validation checks per navigation.
//! - `interceptor`: refresh-and-retry-once middleware for application requests.
//! - `context`: wires the above over one transport.
//!
//! ERROR HANDLING
//! ==============
//! Guard operations never return errors; failures resolve to the
//! unauthenticated session or the blocked availability state. Only raw
//! requests through `ApiClient` surface `ApiError`.

pub mod availability;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod http;
pub mod interceptor;
pub mod session;

pub use availability::{AvailabilityCache, AvailabilityState, Freshness};
pub use config::GuardConfig;
pub use context::PortalContext;
pub use error::{ApiError, ErrorCode};
pub use guard::{GuardDecision, NavigationGuard, Redirect, RouteDescriptor};
pub use session::{Session, SessionManager, UserRecord};
