//! Session service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. The body is
//! always `{"error": "<message>", "code": "<CODE>"}`. Messages for server-side
//! failures are generic; the actual error is logged.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::error::{
    ErrorBody, CODE_AUTHENTICATION_REQUIRED, CODE_INVALID_TOKEN, CODE_SESSION_EXPIRED,
};
use thiserror::Error;

/// Session service error type.
///
/// - AuthenticationRequired, InvalidToken, SessionExpired, InvalidCredentials: 401
/// - Forbidden, AccountDisabled: 403
/// - IdentityNotFound: 404
/// - BadRequest: 400
/// - Storage, Internal: 500
#[derive(Debug, Error)]
pub enum ApiError {
    /// No credential was presented.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Malformed token or bad signature. Never renewed.
    #[error("Invalid token")]
    InvalidToken,

    /// Access token expired and the refresh token is missing, invalid or expired.
    #[error("Session expired, please log in again")]
    SessionExpired,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Access denied")]
    Forbidden,

    #[error("Account is deactivated")]
    AccountDisabled,

    /// The authenticated identity no longer exists.
    #[error("User not found")]
    IdentityNotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::AuthenticationRequired
            | ApiError::InvalidToken
            | ApiError::SessionExpired
            | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden | ApiError::AccountDisabled => StatusCode::FORBIDDEN,
            ApiError::IdentityNotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::AuthenticationRequired => CODE_AUTHENTICATION_REQUIRED,
            ApiError::InvalidToken => CODE_INVALID_TOKEN,
            ApiError::SessionExpired => CODE_SESSION_EXPIRED,
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::AccountDisabled => "ACCOUNT_DISABLED",
            ApiError::IdentityNotFound => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Storage(_) => "STORAGE_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::Storage(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(
                    target: "session.storage",
                    error = %err,
                    "Storage operation failed"
                );
                "An internal storage error occurred".to_string()
            }
            ApiError::Internal(err) => {
                tracing::error!(target: "session.internal", error = %err, "Request failed");
                "An internal error occurred".to_string()
            }
            ApiError::BadRequest(reason) => reason.clone(),
            other => other.to_string(),
        };

        let mut response = (status, Json(ErrorBody::new(message, self.code()))).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}
