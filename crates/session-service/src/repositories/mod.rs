//! Persistence seams for the session service.

pub mod users;

pub use users::{InMemoryUserRepository, UserRepository};
