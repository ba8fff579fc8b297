//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports [`secrecy`] types. Use them for passwords, signing secrets and
//! raw tokens. `SecretString` implements `Debug` with redaction, so structs
//! deriving `Debug` stay safe to log, and the value is zeroized on drop.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct LoginRequest {
//!     email: String,
//!     password: SecretString,
//! }
//!
//! let req = LoginRequest {
//!     email: "alice@example.com".to_string(),
//!     password: SecretString::from("hunter2"),
//! };
//!
//! assert!(!format!("{req:?}").contains("hunter2"));
//! assert_eq!(req.password.expose_secret(), "hunter2");
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::from("hunter2");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("hunter2"));
    }

    #[test]
    fn test_deserialize_login_payload() {
        #[allow(dead_code)]
        #[derive(Debug, Deserialize)]
        struct Credentials {
            email: String,
            password: SecretString,
        }

        let json = r#"{"email": "bob@example.com", "password": "my-secret-value"}"#;
        let creds: Credentials = serde_json::from_str(json).expect("deserialize");

        assert_eq!(creds.password.expose_secret(), "my-secret-value");

        let debug = format!("{creds:?}");
        assert!(!debug.contains("my-secret-value"));
        assert!(debug.contains("bob@example.com"));
    }
}
