//! Test server harness for E2E testing
//!
//! Provides TestSessionServer for spawning real session service instances in
//! tests, backed by an in-memory identity store the test can reach into.

use crate::assertions::cookie_header;
use crate::fixtures::{test_config, TEST_PASSWORD};
use chrono::Utc;
use common::jwt::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use common::types::{Role, SubjectId, UserProfile};
use session_service::config::{Config, MIN_BCRYPT_COST};
use session_service::crypto::{self, TokenIssuer};
use session_service::models::UserRecord;
use session_service::observability::metrics::init_metrics_recorder;
use session_service::repositories::{InMemoryUserRepository, UserRepository};
use session_service::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the session service in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_login_e2e() -> Result<()> {
///     let server = TestSessionServer::spawn().await?;
///     let alice = server.create_user("alice", Role::User).await?;
///
///     let response = reqwest::Client::new()
///         .post(format!("{}/api/users/login", server.url()))
///         .json(&json!({"email": alice.email, "password": TEST_PASSWORD}))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestSessionServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    handle: JoinHandle<()>,
}

impl TestSessionServer {
    /// Spawn a server with [`test_config`] on a random local port.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(test_config()).await
    }

    /// Spawn a server with a caller-supplied configuration.
    ///
    /// The bind address in `config` is ignored; the server always binds to
    /// `127.0.0.1:0`.
    pub async fn spawn_with(config: Config) -> Result<Self, anyhow::Error> {
        let users: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
        let state = Arc::new(AppState::new(config, users));

        // The global recorder can only be installed once per test process.
        // Later servers get a standalone recorder.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                PrometheusBuilder::new().build_recorder().handle()
            }
        };

        let app = routes::build_routes(state.clone(), metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The identity store behind the server
    pub fn users(&self) -> &Arc<dyn UserRepository> {
        &self.state.users
    }

    /// The issuer the server signs with
    pub fn issuer(&self) -> &TokenIssuer {
        &self.state.issuer
    }

    /// Insert an active account named `username` with email
    /// `<username>@example.com` and password [`TEST_PASSWORD`].
    pub async fn create_user(
        &self,
        username: &str,
        role: Role,
    ) -> Result<UserRecord, anyhow::Error> {
        let password_hash = crypto::hash_password(TEST_PASSWORD, MIN_BCRYPT_COST)?;
        let user = self
            .state
            .users
            .insert(UserRecord {
                id: SubjectId::new(),
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash,
                role,
                profile: UserProfile::default(),
                is_active: true,
                last_login: None,
                created_at: Utc::now(),
            })
            .await?;
        Ok(user)
    }

    /// A `Cookie` header carrying a fresh access and refresh token for `user`.
    pub fn session_cookie(&self, user: &UserRecord) -> Result<String, anyhow::Error> {
        let access = self.state.issuer.issue_access(user.id, Some(user.role))?;
        let refresh = self.state.issuer.issue_refresh(user.id)?;
        Ok(cookie_header(&[
            (ACCESS_TOKEN_COOKIE, &access),
            (REFRESH_TOKEN_COOKIE, &refresh),
        ]))
    }
}

impl Drop for TestSessionServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
