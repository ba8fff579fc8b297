//! Request transport.
//!
//! [`Transport`] is the seam between the coordinator and the network. The
//! production implementation keeps a cookie store, so credentials are attached
//! to every request without an explicit header.

use crate::config::ClientConfig;
use crate::errors::ClientError;
use async_trait::async_trait;
use common::error::ErrorBody;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// HTTP method of an [`ApiRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// A request that can be sent, and replayed, any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, including any query string.
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    /// POST without a body.
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: None,
        }
    }

    /// Request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidResponse` if `body` cannot be serialized.
    pub fn json(
        method: Method,
        path: impl Into<String>,
        body: &impl Serialize,
    ) -> Result<Self, ClientError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ClientError::InvalidResponse(format!("Unserializable body: {e}")))?;
        Ok(Self {
            method,
            path: path.into(),
            body: Some(body),
        })
    }

    /// Path without query string or trailing slash.
    pub fn route(&self) -> &str {
        self.path
            .split('?')
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
    }
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Response with a JSON body.
    pub fn with_json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidResponse` if the body doesn't match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ClientError::InvalidResponse(format!("Unexpected response body: {e}")))
    }

    /// The `{error, code}` envelope, if the body is one.
    pub fn error_body(&self) -> Option<ErrorBody> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Convert a failed response into `ClientError::Api`.
    pub fn into_error(self) -> ClientError {
        let (message, code) = match self.error_body() {
            Some(body) => (body.error, body.code),
            None => (String::from_utf8_lossy(&self.body).into_owned(), None),
        };
        ClientError::Api {
            status: self.status,
            code,
            message,
        }
    }

    /// `Ok(self)` for 2xx, `Err(ClientError::Api)` otherwise.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn error_for_status(self) -> Result<Self, ClientError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }
}

/// Sends requests to the session service.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request. Non-2xx statuses are responses, not errors.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError>;
}

/// reqwest-backed transport with a persistent cookie store.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with its own empty cookie store.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::with_cookie_jar(config, Arc::new(reqwest::cookie::Jar::default()))
    }

    /// Build a transport over an existing cookie store.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if the HTTP client cannot be built.
    pub fn with_cookie_jar(
        config: &ClientConfig,
        jar: Arc<reqwest::cookie::Jar>,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .cookie_provider(jar)
            .timeout(config.http_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ClientError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            client,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(
        skip_all,
        name = "client.transport.send",
        fields(method = request.method.as_str(), path = %request.route())
    )]
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let url = format!("{}{}", self.base_url, request.path);

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::debug!(target: "client.transport", error = %e, "HTTP request failed");
            ClientError::Http(e.to_string())
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Http(format!("Failed to read response body: {e}")))?;

        tracing::trace!(target: "client.transport", status, "Response received");

        Ok(ApiResponse::new(status, body.to_vec()))
    }
}

/// Mock transport module for testing.
///
/// [`mock::MockTransport`] behaves like a small session service: protected
/// paths answer 401 while its session is expired, and the refresh endpoint
/// follows a scripted [`mock::RefreshBehavior`].
pub mod mock {
    use super::*;
    use common::error::{CODE_INVALID_TOKEN, CODE_SESSION_EXPIRED};
    use common::types::{Role, SubjectId, UserProfile, UserView};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;

    /// How the mock answers `POST .../refresh`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum RefreshBehavior {
        /// Restore the session and return the account.
        Succeed,
        /// Answer 401 `SESSION_EXPIRED`.
        Reject,
        /// Never answer.
        Hang,
        /// Panic inside `send`.
        Panic,
    }

    /// Scripted stand-in for the session service.
    pub struct MockTransport {
        session_valid: AtomicBool,
        tokens_invalid: AtomicBool,
        reject_login: AtomicBool,
        refresh_behavior: Mutex<RefreshBehavior>,
        refresh_delay: Mutex<Duration>,
        refresh_calls: AtomicUsize,
        requests: Mutex<Vec<String>>,
        user: UserView,
    }

    impl MockTransport {
        /// A signed-in session whose renewals succeed.
        pub fn new() -> Self {
            Self {
                session_valid: AtomicBool::new(true),
                tokens_invalid: AtomicBool::new(false),
                reject_login: AtomicBool::new(false),
                refresh_behavior: Mutex::new(RefreshBehavior::Succeed),
                refresh_delay: Mutex::new(Duration::ZERO),
                refresh_calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                user: UserView {
                    id: SubjectId::new(),
                    username: "ada".to_string(),
                    email: "ada@example.com".to_string(),
                    role: Role::User,
                    profile: UserProfile::default(),
                    is_active: true,
                    last_login: None,
                },
            }
        }

        /// A session whose access token has already expired.
        pub fn expired_session() -> Self {
            let mock = Self::new();
            mock.expire_session();
            mock
        }

        #[must_use]
        pub fn with_refresh(self, behavior: RefreshBehavior) -> Self {
            self.set_refresh(behavior);
            self
        }

        /// Delay every refresh answer by `delay`.
        #[must_use]
        pub fn with_refresh_delay(self, delay: Duration) -> Self {
            *self
                .refresh_delay
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = delay;
            self
        }

        /// Protected paths answer 401 `INVALID_TOKEN`.
        #[must_use]
        pub fn rejecting_tokens_as_invalid(self) -> Self {
            self.tokens_invalid.store(true, Ordering::SeqCst);
            self
        }

        /// Login answers 401 `INVALID_CREDENTIALS`.
        #[must_use]
        pub fn rejecting_login(self) -> Self {
            self.reject_login.store(true, Ordering::SeqCst);
            self
        }

        pub fn set_refresh(&self, behavior: RefreshBehavior) {
            *self
                .refresh_behavior
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = behavior;
        }

        pub fn expire_session(&self) {
            self.session_valid.store(false, Ordering::SeqCst);
        }

        pub fn is_session_valid(&self) -> bool {
            self.session_valid.load(Ordering::SeqCst)
        }

        /// Number of refresh exchanges received.
        pub fn refresh_calls(&self) -> usize {
            self.refresh_calls.load(Ordering::SeqCst)
        }

        /// Number of requests received for `path`.
        pub fn calls_to(&self, path: &str) -> usize {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .filter(|p| p.as_str() == path)
                .count()
        }

        /// The account the mock signs in as.
        pub fn user(&self) -> &UserView {
            &self.user
        }

        fn unauthorized(message: &str, code: &str) -> ApiResponse {
            ApiResponse::with_json(401, &serde_json::json!({"error": message, "code": code}))
        }

        fn account(&self, message: &str) -> ApiResponse {
            ApiResponse::with_json(
                200,
                &serde_json::json!({"message": message, "user": self.user}),
            )
        }

        #[allow(clippy::panic)]
        async fn refresh(&self) -> Result<ApiResponse, ClientError> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);

            let delay = *self
                .refresh_delay
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let behavior = *self
                .refresh_behavior
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match behavior {
                RefreshBehavior::Succeed => {
                    self.session_valid.store(true, Ordering::SeqCst);
                    Ok(self.account("Tokens refreshed"))
                }
                RefreshBehavior::Reject => Ok(Self::unauthorized(
                    "Session expired, please log in again",
                    CODE_SESSION_EXPIRED,
                )),
                RefreshBehavior::Hang => std::future::pending().await,
                RefreshBehavior::Panic => panic!("scripted refresh failure"),
            }
        }
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
            let route = request.route().to_string();
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(route.clone());

            match route.rsplit('/').next().unwrap_or_default() {
                "refresh" => self.refresh().await,
                "login" | "register" => {
                    if self.reject_login.load(Ordering::SeqCst) {
                        return Ok(Self::unauthorized(
                            "Invalid email or password",
                            "INVALID_CREDENTIALS",
                        ));
                    }
                    self.session_valid.store(true, Ordering::SeqCst);
                    Ok(self.account("Logged in successfully"))
                }
                "logout" => {
                    self.session_valid.store(false, Ordering::SeqCst);
                    Ok(ApiResponse::with_json(
                        200,
                        &serde_json::json!({"message": "Logged out successfully"}),
                    ))
                }
                segment => {
                    if self.tokens_invalid.load(Ordering::SeqCst) {
                        return Ok(Self::unauthorized("Invalid token", CODE_INVALID_TOKEN));
                    }
                    if !self.is_session_valid() {
                        return Ok(Self::unauthorized(
                            "Session expired, please log in again",
                            CODE_SESSION_EXPIRED,
                        ));
                    }
                    if segment == "profile" {
                        return Ok(ApiResponse::with_json(
                            200,
                            &serde_json::to_value(&self.user).unwrap_or_default(),
                        ));
                    }
                    Ok(ApiResponse::with_json(200, &serde_json::json!({"path": route})))
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::types::UserView;

    #[test]
    fn test_route_strips_query_and_trailing_slash() {
        assert_eq!(ApiRequest::get("/api/users/login/").route(), "/api/users/login");
        assert_eq!(ApiRequest::get("/api/events?page=2").route(), "/api/events");
    }

    #[test]
    fn test_into_error_reads_envelope() {
        let response = ApiResponse::new(
            403,
            r#"{"error":"Account is deactivated","code":"ACCOUNT_DISABLED"}"#,
        );

        assert_eq!(
            response.into_error(),
            ClientError::Api {
                status: 403,
                code: Some("ACCOUNT_DISABLED".to_string()),
                message: "Account is deactivated".to_string(),
            }
        );
    }

    #[test]
    fn test_into_error_tolerates_plain_text() {
        let err = ApiResponse::new(502, "Bad Gateway").into_error();
        assert_eq!(err.status(), Some(502));
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[test]
    fn test_error_for_status() {
        assert!(ApiResponse::new(204, "").error_for_status().is_ok());
        assert!(ApiResponse::new(500, "").error_for_status().is_err());
    }

    #[tokio::test]
    async fn test_mock_expired_session_answers_session_expired() {
        let mock = mock::MockTransport::expired_session();

        let response = mock.send(&ApiRequest::get("/api/users/profile")).await.unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(
            response.error_body().unwrap().code.as_deref(),
            Some("SESSION_EXPIRED")
        );
        assert_eq!(mock.calls_to("/api/users/profile"), 1);
    }

    #[tokio::test]
    async fn test_mock_refresh_restores_session() {
        let mock = mock::MockTransport::expired_session();

        let response = mock.send(&ApiRequest::post("/api/users/refresh")).await.unwrap();
        assert!(response.is_success());
        assert!(mock.is_session_valid());
        assert_eq!(mock.refresh_calls(), 1);

        let profile: UserView = mock
            .send(&ApiRequest::get("/api/users/profile"))
            .await
            .unwrap()
            .json()
            .unwrap();
        assert_eq!(&profile, mock.user());
    }
}
