//! Session client.
//!
//! Talks to the session service with a persistent cookie store and keeps
//! concurrent callers from racing on session renewal.
//!
//! # Modules
//!
//! - `config` - Client configuration (builder style)
//! - `errors` - `ClientError`, cloneable so one renewal failure reaches every waiter
//! - `transport` - The `Transport` seam, the reqwest implementation and a scripted mock
//! - `coordinator` - Single-flight renewal and replay
//! - `session_store` - Observable holder of the signed-in account
//! - `auth_client` - Login, registration, logout and profile on top of the above
//!
//! # Example
//!
//! ```rust,ignore
//! use session_client::{AuthClient, ClientConfig, ApiRequest};
//!
//! let client = AuthClient::new(ClientConfig::new("http://localhost:5000"))?;
//! client.init().await;
//! client.login("ada@example.com", &SecretString::from("hunter22")).await?;
//!
//! // Expired sessions are renewed once and the request replayed.
//! let response = client.execute(ApiRequest::get("/api/users/profile")).await?;
//! ```

pub mod auth_client;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod session_store;
pub mod transport;

pub use auth_client::{AuthClient, RegisterPayload};
pub use config::ClientConfig;
pub use coordinator::RefreshCoordinator;
pub use errors::ClientError;
pub use session_store::{SessionReceiver, SessionStore};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
