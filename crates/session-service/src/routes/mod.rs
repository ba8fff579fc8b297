//! HTTP routes for the session service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::cookies::CookiePolicy;
use crate::crypto::TokenIssuer;
use crate::handlers;
use crate::middleware::{
    http_metrics_middleware, require_role, require_session, RoleGateState, SessionState,
    UserRoleLookup,
};
use crate::repositories::UserRepository;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use common::types::Role;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Signs and verifies both token kinds.
    pub issuer: Arc<TokenIssuer>,

    /// Identity store.
    pub users: Arc<dyn UserRepository>,

    /// Flags for outgoing session cookies.
    pub cookies: CookiePolicy,
}

impl AppState {
    pub fn new(config: Config, users: Arc<dyn UserRepository>) -> Self {
        Self {
            issuer: Arc::new(TokenIssuer::from_config(&config)),
            cookies: CookiePolicy::new(config.production),
            config,
            users,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK") - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/api/users/{register,login,refresh,logout}` - public, set or clear cookies
/// - `/api/users/profile` - requires a session
/// - `/api/users` - requires a session and the admin role
/// - CORS for the configured origins, with credentials
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let session_state = Arc::new(SessionState {
        issuer: state.issuer.clone(),
        cookies: state.cookies,
    });
    let admin_gate = Arc::new(RoleGateState::new(
        Arc::new(UserRoleLookup::new(state.users.clone())),
        [Role::Admin],
    ));

    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/users/register", post(handlers::register))
        .route("/api/users/login", post(handlers::login))
        .route("/api/users/refresh", post(handlers::refresh))
        .route("/api/users/logout", post(handlers::logout))
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route("/api/users/profile", get(handlers::get_profile))
        .route_layer(middleware::from_fn_with_state(
            session_state.clone(),
            require_session,
        ))
        .with_state(state.clone());

    // The last route_layer runs first: session, then role gate.
    let admin_routes = Router::new()
        .route("/api/users", get(handlers::list_users))
        .route_layer(middleware::from_fn_with_state(admin_gate, require_role))
        .route_layer(middleware::from_fn_with_state(session_state, require_session))
        .with_state(state.clone());

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. CorsLayer - Answer preflights before they reach a handler
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_allowed_origins))
        .layer(middleware::from_fn(http_metrics_middleware))
}

/// Credentialed CORS for an explicit origin list.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(
                    target: "session.routes",
                    origin = %origin,
                    "Ignoring unusable CORS origin"
                );
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
