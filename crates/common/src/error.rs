//! Wire-level error envelope.
//!
//! Every failed request is answered with `{"error": "<message>"}`. The server
//! also fills `code` so that clients can tell an invalid token apart from an
//! expired session without parsing human-readable text.

use serde::{Deserialize, Serialize};

/// Machine code for a missing credential.
pub const CODE_AUTHENTICATION_REQUIRED: &str = "AUTHENTICATION_REQUIRED";

/// Machine code for a malformed or badly signed token.
pub const CODE_INVALID_TOKEN: &str = "INVALID_TOKEN";

/// Machine code for an expired session (access expired, refresh unusable).
pub const CODE_SESSION_EXPIRED: &str = "SESSION_EXPIRED";

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,

    /// Stable machine code. Absent when produced by a foreign server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorBody {
    /// Create an error body with a machine code.
    #[must_use]
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
        }
    }

    /// Whether the body reports a token that can never become valid again.
    #[must_use]
    pub fn is_invalid_token(&self) -> bool {
        self.code.as_deref() == Some(CODE_INVALID_TOKEN)
    }
}
