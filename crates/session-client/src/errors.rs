//! Client error types.

use thiserror::Error;

/// Errors returned by the session client.
///
/// `Clone` because the outcome of one renewal is delivered to every request
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("HTTP client error: {0}")]
    Http(String),

    /// The service answered with a non-success status.
    #[error("Request failed with status {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Renewal was refused; the user has to log in again.
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// Renewal did not settle within the configured timeout.
    #[error("Session renewal timed out")]
    RenewalTimedOut,

    /// Renewal task ended without an outcome (panic or shutdown).
    #[error("Session renewal aborted")]
    RenewalAborted,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The session store was dropped.
    #[error("Session channel closed")]
    ChannelClosed,
}

impl ClientError {
    /// HTTP status of an `Api` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
