//! JWT claims, lifetimes and transport names for the dual-token session.
//!
//! Two token kinds exist:
//! - the access token, short-lived and presented on every request
//! - the refresh token, long-lived and only used to mint new access tokens
//!
//! Each kind is signed with its own secret by the issuer in the service crate.
//! This module holds the parts both sides agree on: claim layouts, lifetimes,
//! cookie names, and the pre-parse size guard.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The `sub` field is redacted in Debug output

use crate::types::{Role, SubjectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Session tokens are ~200 bytes; anything larger is rejected before any
/// base64 decoding or signature work.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Access token lifetime (15 minutes).
pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Refresh token lifetime (7 days).
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Cookie carrying the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie carrying the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Maximum tolerated future drift of `iat` (5 minutes).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

// =============================================================================
// Error Types
// =============================================================================

/// Structural problems detected before signature verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The token is invalid")]
    TokenTooLarge,

    /// Token `iat` claim is too far in the future.
    #[error("The token is invalid")]
    IatTooFarInFuture,
}

// =============================================================================
// Claims Types
// =============================================================================

/// Claims carried by an access token.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (account id) - redacted in Debug output.
    pub sub: SubjectId,

    /// Role at issuance time. Informational only; role checks always
    /// consult the identity store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,
}

impl fmt::Debug for AccessClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessClaims")
            .field("sub", &"[REDACTED]")
            .field("role", &self.role)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish()
    }
}

/// Claims carried by a refresh token.
#[derive(Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject (account id) - redacted in Debug output.
    pub sub: SubjectId,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,
}

impl fmt::Debug for RefreshClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshClaims")
            .field("sub", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish()
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Reject tokens larger than [`MAX_JWT_SIZE_BYTES`].
///
/// # Errors
///
/// Returns `JwtValidationError::TokenTooLarge` when the limit is exceeded.
pub fn check_token_size(token: &str) -> Result<(), JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }
    Ok(())
}

/// Validate the `iat` claim against the current time.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat` lies more than
/// `clock_skew` in the future.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    validate_iat_at(iat, clock_skew, chrono::Utc::now().timestamp())
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // clock_skew is a handful of minutes, well within i64 range
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now + clock_skew_secs;

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

/// Lifetime of a token kind in whole seconds.
#[must_use]
#[allow(clippy::cast_possible_wrap)] // lifetimes are days at most
pub fn ttl_seconds(ttl: Duration) -> i64 {
    ttl.as_secs() as i64
}
