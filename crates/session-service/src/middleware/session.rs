//! Session middleware for protected routes.
//!
//! Per request, with no state shared between requests:
//!
//! 1. Take the access token from the `accessToken` cookie, or failing that
//!    from `Authorization: Bearer`. The cookie wins when both are present.
//! 2. No token: `AuthenticationRequired`. There is no refresh fallback for a
//!    missing token.
//! 3. Invalid token: `InvalidToken`, no refresh fallback.
//! 4. Expired token: verify the `refreshToken` cookie. If it is missing,
//!    invalid or expired the session is over (`SessionExpired`). Otherwise
//!    mint exactly one access token, continue the request as if the original
//!    had been valid, and set the new token as the outgoing access cookie.
//!    The refresh token is not rotated.

use crate::cookies::CookiePolicy;
use crate::crypto::{TokenError, TokenIssuer, TokenKind};
use crate::errors::ApiError;
use crate::models::Identity;
use crate::observability::{hash_for_correlation, metrics::record_silent_renewal};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use common::jwt::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// State for the session middleware.
#[derive(Clone)]
pub struct SessionState {
    pub issuer: Arc<TokenIssuer>,
    pub cookies: CookiePolicy,
}

/// Outcome of resolving a request's credentials.
pub struct ResolvedSession {
    pub identity: Identity,
    /// Access token minted by a silent renewal, to be sent back as a cookie.
    pub renewed_access: Option<String>,
}

impl fmt::Debug for ResolvedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSession")
            .field("identity", &self.identity)
            .field("renewed", &self.renewed_access.is_some())
            .finish()
    }
}

/// Resolve the identity behind a request's headers.
///
/// Pure with respect to the request: the caller decides how to attach the
/// identity and deliver a renewed token.
pub fn resolve_session(
    issuer: &TokenIssuer,
    headers: &HeaderMap,
) -> Result<ResolvedSession, ApiError> {
    let jar = CookieJar::from_headers(headers);

    let Some(token) = extract_access_token(&jar, headers) else {
        tracing::debug!(target: "session.middleware", "No access token presented");
        return Err(ApiError::AuthenticationRequired);
    };

    match issuer.verify(&token, TokenKind::Access) {
        Ok(identity) => Ok(ResolvedSession {
            identity,
            renewed_access: None,
        }),
        Err(TokenError::Expired) => silent_renewal(issuer, &jar),
        Err(TokenError::Invalid) => {
            tracing::debug!(target: "session.middleware", "Access token rejected as invalid");
            Err(ApiError::InvalidToken)
        }
        Err(err @ TokenError::Signing(_)) => Err(err.into()),
    }
}

fn silent_renewal(issuer: &TokenIssuer, jar: &CookieJar) -> Result<ResolvedSession, ApiError> {
    let Some(refresh_token) = cookie_value(jar, REFRESH_TOKEN_COOKIE) else {
        tracing::debug!(target: "session.middleware", "Access token expired, no refresh token");
        record_silent_renewal("no_refresh");
        return Err(ApiError::SessionExpired);
    };

    let refreshed = issuer
        .verify(&refresh_token, TokenKind::Refresh)
        .map_err(|e| {
            tracing::debug!(target: "session.middleware", error = %e, "Refresh token rejected");
            record_silent_renewal("refresh_rejected");
            ApiError::SessionExpired
        })?;

    let access = issuer
        .issue_access(refreshed.subject_id, None)
        .map_err(|e| {
            record_silent_renewal("error");
            ApiError::from(e)
        })?;

    record_silent_renewal("success");
    tracing::info!(
        target: "session.middleware",
        subject = %hash_for_correlation(&refreshed.subject_id.to_string()),
        "Access token silently renewed"
    );

    Ok(ResolvedSession {
        identity: Identity::new(refreshed.subject_id, None),
        renewed_access: Some(access),
    })
}

/// Access token from the cookie, else from the Authorization header.
fn extract_access_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(token) = cookie_value(jar, ACCESS_TOKEN_COOKIE) {
        return Some(token);
    }

    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();

    (!token.is_empty()).then(|| token.to_string())
}

fn cookie_value(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Session middleware.
///
/// # Response
///
/// - 401 with `AUTHENTICATION_REQUIRED`, `INVALID_TOKEN` or `SESSION_EXPIRED`
/// - Otherwise runs the handler with an [`Identity`] extension, appending a
///   fresh `accessToken` cookie when the session was silently renewed
#[instrument(skip_all, name = "session.middleware.require_session")]
pub async fn require_session(
    State(state): State<Arc<SessionState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let resolved = resolve_session(&state.issuer, req.headers())?;

    req.extensions_mut().insert(resolved.identity);
    let response = next.run(req).await;

    match resolved.renewed_access {
        Some(token) => {
            let jar = CookieJar::new().add(state.cookies.access_cookie(token));
            Ok((jar, response).into_response())
        }
        None => Ok(response),
    }
}
