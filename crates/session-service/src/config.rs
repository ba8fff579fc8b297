//! Session service configuration.
//!
//! Configuration is loaded from environment variables. Signing secrets are
//! held as `SecretString` and redacted in Debug output.
//!
//! The access and refresh secrets are two independent trust boundaries: both
//! must be configured explicitly, must differ, and must be at least
//! [`MIN_SECRET_BYTES`] long. Nothing is ever derived from the other.

use common::secret::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5000";

/// Default bcrypt cost for password hashing.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Lowest bcrypt cost accepted by the bcrypt crate.
pub const MIN_BCRYPT_COST: u32 = 4;

/// Highest bcrypt cost accepted by the bcrypt crate.
pub const MAX_BCRYPT_COST: u32 = 31;

/// Minimum length of each signing secret in bytes.
pub const MIN_SECRET_BYTES: usize = 32;

/// Upper bound for `exp` leeway.
pub const MAX_JWT_LEEWAY_SECONDS: u64 = 300;

/// Origins allowed to make credentialed requests when none are configured.
pub const DEFAULT_CORS_ALLOWED_ORIGINS: &str = "http://localhost:4200,http://127.0.0.1:4200";

/// Account created at startup when `ADMIN_EMAIL` and `ADMIN_PASSWORD` are set.
#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub username: String,
    pub password: SecretString,
}

impl fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Session service configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address.
    pub bind_address: String,

    /// Secret signing access tokens (`JWT_SECRET`).
    pub access_secret: SecretString,

    /// Secret signing refresh tokens (`JWT_REFRESH_SECRET`).
    pub refresh_secret: SecretString,

    /// Production mode: session cookies get the `Secure` flag.
    pub production: bool,

    /// Origins allowed to send credentialed cross-origin requests.
    pub cors_allowed_origins: Vec<String>,

    /// bcrypt cost for password hashing.
    pub bcrypt_cost: u32,

    /// Tolerance applied to `exp` when verifying tokens.
    pub jwt_leeway_seconds: u64,

    /// Optional admin account seeded at startup.
    pub admin_seed: Option<AdminSeed>,
}

/// Custom Debug implementation that redacts the signing secrets.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("access_secret", &"[REDACTED]")
            .field("refresh_secret", &"[REDACTED]")
            .field("production", &self.production)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("jwt_leeway_seconds", &self.jwt_leeway_seconds)
            .field("admin_seed", &self.admin_seed)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Signing secret too short: {0}")]
    WeakSecret(String),

    #[error("JWT_SECRET and JWT_REFRESH_SECRET must be different values")]
    SharedSecret,

    #[error("Invalid bcrypt cost configuration: {0}")]
    InvalidBcryptCost(String),

    #[error("Invalid JWT leeway configuration: {0}")]
    InvalidJwtLeeway(String),

    #[error("Invalid admin seed configuration: {0}")]
    InvalidAdminSeed(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let access_secret = required_secret(vars, "JWT_SECRET")?;
        let refresh_secret = required_secret(vars, "JWT_REFRESH_SECRET")?;

        if access_secret.expose_secret() == refresh_secret.expose_secret() {
            return Err(ConfigError::SharedSecret);
        }

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let production = vars
            .get("APP_ENV")
            .is_some_and(|v| v.eq_ignore_ascii_case("production"));

        let cors_allowed_origins = vars
            .get("CORS_ALLOWED_ORIGINS")
            .map(String::as_str)
            .unwrap_or(DEFAULT_CORS_ALLOWED_ORIGINS)
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect();

        let bcrypt_cost = if let Some(value_str) = vars.get("BCRYPT_COST") {
            let value: u32 = value_str.parse().map_err(|e| {
                ConfigError::InvalidBcryptCost(format!(
                    "BCRYPT_COST must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&value) {
                return Err(ConfigError::InvalidBcryptCost(format!(
                    "BCRYPT_COST must be between {} and {}, got {}",
                    MIN_BCRYPT_COST, MAX_BCRYPT_COST, value
                )));
            }

            value
        } else {
            DEFAULT_BCRYPT_COST
        };

        let jwt_leeway_seconds = if let Some(value_str) = vars.get("JWT_LEEWAY_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtLeeway(format!(
                    "JWT_LEEWAY_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_JWT_LEEWAY_SECONDS {
                return Err(ConfigError::InvalidJwtLeeway(format!(
                    "JWT_LEEWAY_SECONDS must not exceed {} seconds, got {}",
                    MAX_JWT_LEEWAY_SECONDS, value
                )));
            }

            value
        } else {
            0
        };

        let admin_seed = match (vars.get("ADMIN_EMAIL"), vars.get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed {
                email: email.trim().to_lowercase(),
                username: vars
                    .get("ADMIN_USERNAME")
                    .cloned()
                    .unwrap_or_else(|| "admin".to_string()),
                password: SecretString::from(password.clone()),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::InvalidAdminSeed(
                    "ADMIN_EMAIL and ADMIN_PASSWORD must be set together".to_string(),
                ))
            }
        };

        Ok(Config {
            bind_address,
            access_secret,
            refresh_secret,
            production,
            cors_allowed_origins,
            bcrypt_cost,
            jwt_leeway_seconds,
            admin_seed,
        })
    }
}

fn required_secret(
    vars: &HashMap<String, String>,
    name: &str,
) -> Result<SecretString, ConfigError> {
    let value = vars
        .get(name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))?;

    if value.len() < MIN_SECRET_BYTES {
        return Err(ConfigError::WeakSecret(format!(
            "{} must be at least {} bytes, got {}",
            name,
            MIN_SECRET_BYTES,
            value.len()
        )));
    }

    Ok(SecretString::from(value.clone()))
}
