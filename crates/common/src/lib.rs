//! Common types shared by the session service and its clients.

#![warn(clippy::pedantic)]

/// Module for the wire-level error envelope
pub mod error;

/// Module for shared identity and user types
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT claims, lifetimes and cookie names
pub mod jwt;
