//! Session Service Library
//!
//! Cookie-based dual-token sessions for a small web application:
//!
//! - Short-lived access tokens (15 minutes) and long-lived refresh tokens
//!   (7 days), signed with independent secrets
//! - Session middleware that silently renews an expired access token when the
//!   refresh token is still good
//! - A role gate that resolves the caller's current role from the identity
//!   store
//! - Account registration, login, renewal and logout under `/api/users`
//!
//! # Architecture
//!
//! Handler -> Service -> Repository:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `cookies` - Session cookie flags and lifetimes
//! - `crypto` - Token issuance, verification and password hashing
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Session, role gate and HTTP metrics middleware
//! - `models` - Identity and account records
//! - `observability` - Metrics and log correlation helpers
//! - `repositories` - Identity store
//! - `routes` - Axum router setup
//! - `services` - Account and session business logic

pub mod config;
pub mod cookies;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
