//! Token issuance and verification, plus password hashing.
//!
//! Access and refresh tokens are HS256 JWTs signed with two independent
//! secrets. Verification distinguishes a token that has merely lapsed
//! ([`TokenError::Expired`]) from one that can never be valid
//! ([`TokenError::Invalid`]); the session middleware only attempts renewal for
//! the former.

use crate::config::{Config, MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::errors::ApiError;
use crate::models::Identity;
use crate::observability::metrics::{record_token_issuance, record_token_validation};
use common::jwt::{
    check_token_size, ttl_seconds, validate_iat, AccessClaims, RefreshClaims, ACCESS_TOKEN_TTL,
    DEFAULT_CLOCK_SKEW, REFRESH_TOKEN_TTL,
};
use common::secret::{ExposeSecret, SecretString};
use common::types::{Role, SubjectId};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use std::fmt;
use thiserror::Error;
use tracing::instrument;

/// Which secret a token is signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Token verification and signing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Well-formed and correctly signed, but past its `exp`.
    #[error("Token expired")]
    Expired,

    /// Malformed, oversized, wrongly signed, or otherwise unusable.
    #[error("Token invalid")]
    Invalid,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => ApiError::SessionExpired,
            TokenError::Invalid => ApiError::InvalidToken,
            TokenError::Signing(reason) => ApiError::Internal(reason),
        }
    }
}

/// Issues and verifies access and refresh tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    leeway_seconds: u64,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_secret", &"[REDACTED]")
            .field("refresh_secret", &"[REDACTED]")
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl TokenIssuer {
    /// Build an issuer from two independent secrets.
    pub fn new(
        access_secret: &SecretString,
        refresh_secret: &SecretString,
        leeway_seconds: u64,
    ) -> Self {
        let access = access_secret.expose_secret().as_bytes();
        let refresh = refresh_secret.expose_secret().as_bytes();

        Self {
            access_encoding: EncodingKey::from_secret(access),
            access_decoding: DecodingKey::from_secret(access),
            refresh_encoding: EncodingKey::from_secret(refresh),
            refresh_decoding: DecodingKey::from_secret(refresh),
            leeway_seconds,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.access_secret,
            &config.refresh_secret,
            config.jwt_leeway_seconds,
        )
    }

    /// Issue a 15-minute access token.
    #[instrument(skip_all)]
    pub fn issue_access(
        &self,
        subject_id: SubjectId,
        role: Option<Role>,
    ) -> Result<String, TokenError> {
        self.issue_access_at(subject_id, role, chrono::Utc::now().timestamp())
    }

    /// Issue an access token as if it had been issued at `issued_at`.
    pub fn issue_access_at(
        &self,
        subject_id: SubjectId,
        role: Option<Role>,
        issued_at: i64,
    ) -> Result<String, TokenError> {
        let claims = AccessClaims {
            sub: subject_id,
            role,
            iat: issued_at,
            exp: issued_at + ttl_seconds(ACCESS_TOKEN_TTL),
        };
        sign(TokenKind::Access, &claims, &self.access_encoding)
    }

    /// Issue a 7-day refresh token.
    #[instrument(skip_all)]
    pub fn issue_refresh(&self, subject_id: SubjectId) -> Result<String, TokenError> {
        self.issue_refresh_at(subject_id, chrono::Utc::now().timestamp())
    }

    /// Issue a refresh token as if it had been issued at `issued_at`.
    pub fn issue_refresh_at(
        &self,
        subject_id: SubjectId,
        issued_at: i64,
    ) -> Result<String, TokenError> {
        let claims = RefreshClaims {
            sub: subject_id,
            iat: issued_at,
            exp: issued_at + ttl_seconds(REFRESH_TOKEN_TTL),
        };
        sign(TokenKind::Refresh, &claims, &self.refresh_encoding)
    }

    /// Verify a token against the secret for `kind`.
    ///
    /// The size check runs before any decoding. Signature and format failures
    /// yield `Invalid`; a correctly signed token past its `exp` yields
    /// `Expired`. An `iat` more than five minutes in the future is `Invalid`.
    #[instrument(skip_all, fields(kind = kind.as_str()))]
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Identity, TokenError> {
        let result = self.verify_inner(token, kind);

        let outcome = match &result {
            Ok(_) => "valid",
            Err(TokenError::Expired) => "expired",
            Err(_) => "invalid",
        };
        record_token_validation(kind.as_str(), outcome);

        result
    }

    fn verify_inner(&self, token: &str, kind: TokenKind) -> Result<Identity, TokenError> {
        check_token_size(token).map_err(|_| TokenError::Invalid)?;

        let (subject_id, role, iat) = match kind {
            TokenKind::Access => {
                let claims: AccessClaims = self.decode(token, &self.access_decoding)?;
                (claims.sub, claims.role, claims.iat)
            }
            TokenKind::Refresh => {
                let claims: RefreshClaims = self.decode(token, &self.refresh_decoding)?;
                (claims.sub, None, claims.iat)
            }
        };

        validate_iat(iat, DEFAULT_CLOCK_SKEW).map_err(|_| TokenError::Invalid)?;

        Ok(Identity::new(subject_id, role))
    }

    fn decode<T: DeserializeOwned>(&self, token: &str, key: &DecodingKey) -> Result<T, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = self.leeway_seconds;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<T>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => {
                    tracing::debug!(
                        target: "session.crypto",
                        error = %e,
                        "Token verification failed"
                    );
                    TokenError::Invalid
                }
            })
    }
}

fn sign<T: serde::Serialize>(
    kind: TokenKind,
    claims: &T,
    key: &EncodingKey,
) -> Result<String, TokenError> {
    let result = encode(&Header::new(Algorithm::HS256), claims, key)
        .map_err(|e| TokenError::Signing(format!("JWT signing operation failed: {}", e)));

    record_token_issuance(
        kind.as_str(),
        if result.is_ok() { "success" } else { "error" },
    );

    result
}

/// Hash a password with bcrypt at `cost`.
///
/// # Errors
///
/// Returns `ApiError::Internal` when the cost is outside the bcrypt range or
/// hashing fails.
#[instrument(skip_all)]
pub fn hash_password(password: &str, cost: u32) -> Result<String, ApiError> {
    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        return Err(ApiError::Internal(format!(
            "Invalid bcrypt cost: {} (must be {}-{})",
            cost, MIN_BCRYPT_COST, MAX_BCRYPT_COST
        )));
    }

    bcrypt::hash(password, cost)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a bcrypt hash.
#[instrument(skip_all)]
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    bcrypt::verify(password, hash)
        .map_err(|e| ApiError::Internal(format!("Password verification failed: {}", e)))
}
