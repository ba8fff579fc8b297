//! Deterministic configuration fixtures.

use session_service::config::{Config, MIN_BCRYPT_COST};
use std::collections::HashMap;

/// Access token secret used by every test server.
pub const TEST_ACCESS_SECRET: &str = "test-access-secret-do-not-use-in-production";

/// Refresh token secret used by every test server.
pub const TEST_REFRESH_SECRET: &str = "test-refresh-secret-do-not-use-in-production";

/// Password given to every account created through the harness.
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Environment variables for a local test server.
///
/// Uses the cheapest bcrypt cost so login-heavy tests stay fast.
pub fn test_vars() -> HashMap<String, String> {
    HashMap::from([
        ("JWT_SECRET".to_string(), TEST_ACCESS_SECRET.to_string()),
        ("JWT_REFRESH_SECRET".to_string(), TEST_REFRESH_SECRET.to_string()),
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ("BCRYPT_COST".to_string(), MIN_BCRYPT_COST.to_string()),
    ])
}

/// Configuration built from [`test_vars`].
pub fn test_config() -> Config {
    Config::from_vars(&test_vars()).expect("test configuration must be valid")
}
