//! Session token pairs: issuance at login and explicit renewal.

use crate::crypto::{TokenIssuer, TokenKind};
use crate::errors::ApiError;
use crate::models::UserRecord;
use crate::observability::hash_for_correlation;
use crate::repositories::UserRepository;
use std::fmt;
use tracing::instrument;

/// A freshly issued access/refresh pair.
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Issue a new access/refresh pair for `user`.
#[instrument(skip_all)]
pub fn issue_session(issuer: &TokenIssuer, user: &UserRecord) -> Result<SessionTokens, ApiError> {
    Ok(SessionTokens {
        access_token: issuer.issue_access(user.id, Some(user.role))?,
        refresh_token: issuer.issue_refresh(user.id)?,
    })
}

/// Exchange a refresh token for a new pair.
///
/// Any problem with the refresh token, or an account that no longer exists,
/// ends the session (`SessionExpired`). A deactivated account is
/// `AccountDisabled`.
#[instrument(skip_all)]
pub async fn renew_session(
    issuer: &TokenIssuer,
    users: &dyn UserRepository,
    refresh_token: Option<&str>,
) -> Result<(UserRecord, SessionTokens), ApiError> {
    let Some(refresh_token) = refresh_token else {
        tracing::debug!(target: "session.services.token", "Renewal rejected: no refresh token");
        return Err(ApiError::SessionExpired);
    };

    let identity = issuer
        .verify(refresh_token, TokenKind::Refresh)
        .map_err(|e| {
            tracing::debug!(target: "session.services.token", error = %e, "Renewal rejected");
            ApiError::SessionExpired
        })?;

    let subject = hash_for_correlation(&identity.subject_id.to_string());

    let Some(user) = users.find_by_id(identity.subject_id).await? else {
        tracing::info!(
            target: "session.services.token",
            subject = %subject,
            "Renewal rejected: account no longer exists"
        );
        return Err(ApiError::SessionExpired);
    };

    if !user.is_active {
        tracing::info!(
            target: "session.services.token",
            subject = %subject,
            "Renewal rejected: account deactivated"
        );
        return Err(ApiError::AccountDisabled);
    }

    let tokens = issue_session(issuer, &user)?;

    tracing::debug!(target: "session.services.token", subject = %subject, "Session renewed");

    Ok((user, tokens))
}
