//! HTTP request handlers.

pub mod auth_handler;
pub mod health;
pub mod metrics;
pub mod users;

pub use auth_handler::{login, logout, refresh, register};
pub use health::health_check;
pub use metrics::metrics_handler;
pub use users::{get_profile, list_users};
