use chrono::{DateTime, Utc};
use common::secret::SecretString;
use common::types::{Role, SubjectId, UserProfile, UserView};
use serde::Deserialize;
use std::fmt;

/// Identity attached to a request by the session middleware.
///
/// `role` is `None` until the role gate resolves it from the user store.
/// Tokens renewed by the middleware never carry a role.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub subject_id: SubjectId,
    pub role: Option<Role>,
}

impl Identity {
    pub fn new(subject_id: SubjectId, role: Option<Role>) -> Self {
        Self { subject_id, role }
    }
}

/// Custom Debug implementation that redacts the subject id.
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("subject_id", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

/// Stored account.
#[derive(Clone)]
pub struct UserRecord {
    pub id: SubjectId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub profile: UserProfile,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Public view without the password hash.
    pub fn to_view(&self) -> UserView {
        UserView {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            profile: self.profile.clone(),
            is_active: self.is_active,
            last_login: self.last_login,
        }
    }
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    #[serde(default)]
    pub profile: Option<UserProfile>,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: SecretString,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn record() -> UserRecord {
        UserRecord {
            id: SubjectId::new(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$2b$04$abcdefghijklmnopqrstuv".to_string(),
            role: Role::Organizer,
            profile: UserProfile::default(),
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_to_view_copies_public_fields() {
        let record = record();
        let view = record.to_view();

        assert_eq!(view.id, record.id);
        assert_eq!(view.username, "alice");
        assert_eq!(view.role, Role::Organizer);
        assert!(view.is_active);
    }

    #[test]
    fn test_user_record_debug_redacts_hash() {
        let debug_str = format!("{:?}", record());
        assert!(!debug_str.contains("$2b$"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_identity_debug_redacts_subject() {
        let identity = Identity::new(SubjectId::new(), Some(Role::Admin));
        let debug_str = format!("{identity:?}");

        assert!(!debug_str.contains(&identity.subject_id.to_string()));
        assert!(debug_str.contains("Admin"));
    }

    #[test]
    fn test_login_request_debug_redacts_password() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"email":"a@b.co","password":"hunter22"}"#).unwrap();
        assert!(!format!("{req:?}").contains("hunter22"));
    }
}
