//! Client configuration.

use crate::errors::ClientError;
use std::time::Duration;

/// Path prefix of the account endpoints.
pub const DEFAULT_API_PREFIX: &str = "/api/users";

/// Upper bound on a single renewal exchange.
pub const DEFAULT_RENEWAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout for the HTTP client.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for [`crate::AuthClient`] and [`crate::HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Service base URL without trailing slash (e.g. `http://localhost:5000`).
    pub base_url: String,

    /// Prefix of the account endpoints.
    pub api_prefix: String,

    /// A renewal still pending after this long fails every waiter.
    pub renewal_timeout: Duration,

    /// HTTP request timeout.
    pub http_timeout: Duration,

    /// HTTP connect timeout.
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration with default timeouts.
    ///
    /// # Security Warning
    ///
    /// Session cookies are `Secure` in production and will not be sent over
    /// plain HTTP. Use [`ClientConfig::new_secure`] to enforce HTTPS.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            renewal_timeout: DEFAULT_RENEWAL_TIMEOUT,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Create a configuration requiring HTTPS.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if the URL doesn't use HTTPS.
    pub fn new_secure(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let base_url = base_url.into();
        if !base_url.starts_with("https://") {
            return Err(ClientError::Configuration(
                "Session service URL must use HTTPS in production".into(),
            ));
        }
        Ok(Self::new(base_url))
    }

    #[must_use]
    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_renewal_timeout(mut self, timeout: Duration) -> Self {
        self.renewal_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Path of an account endpoint, e.g. `endpoint("login")`.
    pub fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.api_prefix, name)
    }
}
