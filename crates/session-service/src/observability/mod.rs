//! Observability for the session service.
//!
//! # Privacy by Default
//!
//! Request-path functions use `#[instrument(skip_all)]` and log an explicit
//! allow-list of fields:
//! - **SAFE**: logged as-is (outcomes, token kinds, roles)
//! - **HASHED**: subject ids, logged as a truncated SHA-256 for correlation
//! - **NEVER**: tokens, secrets, passwords

pub mod metrics;

use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars).
///
/// One-way hash for correlating log lines about the same account. Not a
/// protection for secrets.
pub fn hash_for_correlation(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest.iter().take(4).copied().collect::<Vec<u8>>())
}
