//! HTTP middleware.
//!
//! - `session` - access token validation with silent renewal
//! - `role_gate` - role check against the identity store
//! - `http_metrics` - request metrics for every response

pub mod http_metrics;
pub mod role_gate;
pub mod session;

pub use http_metrics::http_metrics_middleware;
pub use role_gate::{require_role, IdentityLookup, RoleGateState, UserRoleLookup};
pub use session::{require_session, resolve_session, ResolvedSession, SessionState};
