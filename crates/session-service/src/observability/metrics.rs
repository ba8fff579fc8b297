//! Metrics definitions for the session service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `session_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Every label is bounded by code:
//! - `kind`: access, refresh
//! - `status`: success, error
//! - `outcome`: a handful of values per metric, listed on each function
//! - `endpoint`: known paths, everything else collapses to `/other`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used by
/// `GET /metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("session_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record a token issuance attempt.
///
/// Metric: `session_token_issuance_total`
/// Labels: `kind` (access, refresh), `status` (success, error)
pub fn record_token_issuance(kind: &str, status: &str) {
    counter!("session_token_issuance_total",
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a token verification result.
///
/// Metric: `session_validations_total`
/// Labels: `kind` (access, refresh), `outcome` (valid, expired, invalid)
pub fn record_token_validation(kind: &str, outcome: &str) {
    counter!("session_validations_total",
        "kind" => kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a silent renewal performed by the session middleware.
///
/// Metric: `session_silent_renewals_total`
/// Labels: `status` (success, no_refresh, refresh_rejected, error)
pub fn record_silent_renewal(status: &str) {
    counter!("session_silent_renewals_total", "status" => status.to_string()).increment(1);
}

/// Record a role gate decision.
///
/// Metric: `session_role_checks_total`
/// Labels: `outcome` (allowed, forbidden, not_found, error)
pub fn record_role_check(outcome: &str) {
    counter!("session_role_checks_total", "outcome" => outcome.to_string()).increment(1);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `session_http_requests_total`, `session_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);

    histogram!("session_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("session_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Map a request path onto a bounded set of endpoint labels.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/metrics" => "/metrics",
        "/api/users" => "/api/users",
        "/api/users/register" => "/api/users/register",
        "/api/users/login" => "/api/users/login",
        "/api/users/refresh" => "/api/users/refresh",
        "/api/users/logout" => "/api/users/logout",
        "/api/users/profile" => "/api/users/profile",
        _ => "/other",
    }
}
