//! # Session Test Utilities
//!
//! Shared test utilities for the session service and its client.
//!
//! This crate provides:
//! - Fixed signing secrets and a ready-made [`test_config`]
//! - Token builders that backdate or tamper tokens (TestTokenBuilder)
//! - Server test harness (TestSessionServer for E2E tests)
//! - Fixed test IDs
//! - Cookie assertions on response headers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use session_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestSessionServer::spawn().await?;
//!     let alice = server.create_user("alice", Role::User).await?;
//!
//!     // An access token that expired a minute ago
//!     let token = TestTokenBuilder::new()
//!         .for_subject(alice.id)
//!         .issued_minutes_ago(16)
//!         .build_access();
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod server_harness;
pub mod test_ids;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use fixtures::*;
pub use server_harness::*;
pub use test_ids::*;
pub use token_builders::*;
