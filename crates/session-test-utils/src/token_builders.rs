//! Builder patterns for test tokens
//!
//! Tokens are signed directly with `jsonwebtoken` and the fixture secrets, so
//! the service's own issuer is never involved in producing them. Backdating
//! `iat` moves `exp` with it, which is how tests reach "minute 16" or "day 8"
//! of a session without sleeping.

use crate::fixtures::{TEST_ACCESS_SECRET, TEST_REFRESH_SECRET};
use crate::test_ids::TEST_SUBJECT_ALICE;
use chrono::{Duration, Utc};
use common::jwt::{ttl_seconds, AccessClaims, RefreshClaims, ACCESS_TOKEN_TTL, REFRESH_TOKEN_TTL};
use common::types::{Role, SubjectId};
use jsonwebtoken::{encode, EncodingKey, Header};

/// Builder for signed access and refresh tokens
///
/// # Example
/// ```rust,ignore
/// let expired = TestTokenBuilder::new()
///     .for_subject(alice.id)
///     .issued_minutes_ago(16)
///     .build_access();
/// ```
pub struct TestTokenBuilder {
    sub: SubjectId,
    role: Option<Role>,
    iat: i64,
    access_secret: String,
    refresh_secret: String,
}

impl TestTokenBuilder {
    /// Create a builder for Alice, issued now, signed with the fixture secrets
    pub fn new() -> Self {
        Self {
            sub: TEST_SUBJECT_ALICE,
            role: None,
            iat: Utc::now().timestamp(),
            access_secret: TEST_ACCESS_SECRET.to_string(),
            refresh_secret: TEST_REFRESH_SECRET.to_string(),
        }
    }

    /// Set the subject
    pub fn for_subject(mut self, subject: SubjectId) -> Self {
        self.sub = subject;
        self
    }

    /// Set the informational role claim on access tokens
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Backdate issuance by whole minutes
    pub fn issued_minutes_ago(mut self, minutes: i64) -> Self {
        self.iat = (Utc::now() - Duration::minutes(minutes)).timestamp();
        self
    }

    /// Backdate issuance by whole days
    pub fn issued_days_ago(mut self, days: i64) -> Self {
        self.iat = (Utc::now() - Duration::days(days)).timestamp();
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Sign both kinds with a single secret (a misconfigured issuer)
    pub fn signed_with(mut self, secret: &str) -> Self {
        self.access_secret = secret.to_string();
        self.refresh_secret = secret.to_string();
        self
    }

    /// Access token, expiring 15 minutes after `iat`
    pub fn build_access(&self) -> String {
        let claims = AccessClaims {
            sub: self.sub,
            role: self.role,
            iat: self.iat,
            exp: self.iat + ttl_seconds(ACCESS_TOKEN_TTL),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.access_secret.as_bytes()),
        )
        .expect("test access token must encode")
    }

    /// Refresh token, expiring 7 days after `iat`
    pub fn build_refresh(&self) -> String {
        let claims = RefreshClaims {
            sub: self.sub,
            iat: self.iat,
            exp: self.iat + ttl_seconds(REFRESH_TOKEN_TTL),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.refresh_secret.as_bytes()),
        )
        .expect("test refresh token must encode")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Flip one character of the signature so verification fails.
pub fn tampered(token: &str) -> String {
    let mut chars: Vec<char> = token.chars().collect();
    let last = chars.last_mut().expect("token must not be empty");
    *last = if *last == 'A' { 'B' } else { 'A' };
    chars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_produces_three_part_tokens() {
        let builder = TestTokenBuilder::new().with_role(Role::Admin);
        assert_eq!(builder.build_access().split('.').count(), 3);
        assert_eq!(builder.build_refresh().split('.').count(), 3);
    }

    #[test]
    fn test_access_and_refresh_differ() {
        let builder = TestTokenBuilder::new();
        assert_ne!(builder.build_access(), builder.build_refresh());
    }

    #[test]
    fn test_tampered_changes_signature_only() {
        let token = TestTokenBuilder::new().build_access();
        let bad = tampered(&token);

        assert_ne!(token, bad);
        assert_eq!(token.len(), bad.len());
        assert_eq!(
            token.rsplit_once('.').unwrap().0,
            bad.rsplit_once('.').unwrap().0
        );
    }
}
