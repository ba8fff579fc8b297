//! Account operations on top of the coordinator and session store.

use crate::config::ClientConfig;
use crate::coordinator::RefreshCoordinator;
use crate::errors::ClientError;
use crate::session_store::SessionStore;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
use common::secret::{ExposeSecret, SecretString};
use common::types::{AuthResponse, UserProfile, UserView};
use std::sync::Arc;
use tracing::instrument;

/// Registration form.
pub struct RegisterPayload {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub profile: Option<UserProfile>,
}

impl std::fmt::Debug for RegisterPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterPayload")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("profile", &self.profile)
            .finish()
    }
}

/// Session-aware client for the account endpoints.
#[derive(Debug, Clone)]
pub struct AuthClient {
    config: ClientConfig,
    coordinator: RefreshCoordinator,
    session: SessionStore,
}

impl AuthClient {
    /// Client over HTTP with its own cookie store.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let session = SessionStore::new();
        let coordinator = RefreshCoordinator::new(transport, session.clone(), &config);
        Self {
            config,
            coordinator,
            session,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Restore the session at startup by fetching the profile.
    ///
    /// Runs once per client; later calls are no-ops. Returns whether this
    /// call performed the fetch.
    pub async fn init(&self) -> bool {
        self.session
            .initialize_with(|| async {
                match self.fetch_profile().await {
                    Ok(_) => tracing::info!(target: "client.auth", "Existing session restored"),
                    Err(e) => {
                        tracing::debug!(target: "client.auth", error = %e, "No session to restore");
                    }
                }
            })
            .await
    }

    /// # Errors
    ///
    /// `ClientError::Api` with status 401 for bad credentials, 403 for a
    /// deactivated account.
    #[instrument(skip_all, name = "client.auth.login")]
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<UserView, ClientError> {
        let body = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
        });
        let request = ApiRequest {
            method: Method::Post,
            path: self.config.endpoint("login"),
            body: Some(body),
        };
        self.authenticate(request).await
    }

    /// # Errors
    ///
    /// `ClientError::Api` with status 400 for validation failures.
    #[instrument(skip_all, name = "client.auth.register")]
    pub async fn register(&self, payload: &RegisterPayload) -> Result<UserView, ClientError> {
        let mut body = serde_json::json!({
            "username": payload.username,
            "email": payload.email,
            "password": payload.password.expose_secret(),
        });
        if let (Some(profile), Some(object)) = (&payload.profile, body.as_object_mut()) {
            let profile = serde_json::to_value(profile)
                .map_err(|e| ClientError::InvalidResponse(format!("Unserializable profile: {e}")))?;
            object.insert("profile".to_string(), profile);
        }
        let request = ApiRequest {
            method: Method::Post,
            path: self.config.endpoint("register"),
            body: Some(body),
        };
        self.authenticate(request).await
    }

    /// End the session. The store is cleared even when the call fails.
    ///
    /// # Errors
    ///
    /// Transport failures and non-2xx responses.
    #[instrument(skip_all, name = "client.auth.logout")]
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self
            .coordinator
            .execute(ApiRequest::post(self.config.endpoint("logout")))
            .await
            .and_then(ApiResponse::error_for_status);

        self.session.clear();
        result.map(|_| ())
    }

    /// Fetch the signed-in account. Clears the store on failure.
    ///
    /// # Errors
    ///
    /// Renewal errors, transport failures and non-2xx responses.
    #[instrument(skip_all, name = "client.auth.fetch_profile")]
    pub async fn fetch_profile(&self) -> Result<UserView, ClientError> {
        let result = self
            .coordinator
            .execute(ApiRequest::get(self.config.endpoint("profile")))
            .await
            .and_then(ApiResponse::error_for_status)
            .and_then(|response| response.json::<UserView>());

        match result {
            Ok(user) => {
                self.session.set(user.clone());
                Ok(user)
            }
            Err(e) => {
                self.session.clear();
                Err(e)
            }
        }
    }

    /// Send any other request through the coordinator.
    ///
    /// # Errors
    ///
    /// See [`RefreshCoordinator::execute`].
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        self.coordinator.execute(request).await
    }

    async fn authenticate(&self, request: ApiRequest) -> Result<UserView, ClientError> {
        let response = self.coordinator.execute(request).await?.error_for_status()?;
        let AuthResponse { user, .. } = response.json()?;
        self.session.set(user.clone());
        Ok(user)
    }
}
