//! Business logic behind the auth endpoints.

pub mod token_service;
pub mod user_service;
