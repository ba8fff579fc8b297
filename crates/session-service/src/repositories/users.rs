//! User repository.
//!
//! Storage of accounts is behind [`UserRepository`] so the handlers and the
//! role gate never depend on a concrete store. The shipped implementation
//! keeps accounts in memory.

use crate::errors::ApiError;
use crate::models::UserRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::types::SubjectId;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Account storage operations.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account.
    ///
    /// Fails with `ApiError::BadRequest` when the email or username is taken.
    async fn insert(&self, user: UserRecord) -> Result<UserRecord, ApiError>;

    async fn find_by_id(&self, id: SubjectId) -> Result<Option<UserRecord>, ApiError>;

    /// Lookup by (already normalized) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, ApiError>;

    async fn update_last_login(&self, id: SubjectId, at: DateTime<Utc>) -> Result<(), ApiError>;

    /// Activate or deactivate an account. Returns false when the id is unknown.
    async fn set_active(&self, id: SubjectId, active: bool) -> Result<bool, ApiError>;

    /// Delete an account. Returns false when the id is unknown.
    async fn remove(&self, id: SubjectId) -> Result<bool, ApiError>;

    /// All accounts, oldest first.
    async fn list(&self) -> Result<Vec<UserRecord>, ApiError>;
}

/// In-memory account store.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<SubjectId, UserRecord>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: UserRecord) -> Result<UserRecord, ApiError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(ApiError::BadRequest("Email already in use".to_string()));
        }
        if users.values().any(|u| u.username == user.username) {
            return Err(ApiError::BadRequest("Username already taken".to_string()));
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: SubjectId) -> Result<Option<UserRecord>, ApiError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, ApiError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_last_login(&self, id: SubjectId, at: DateTime<Utc>) -> Result<(), ApiError> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn set_active(&self, id: SubjectId, active: bool) -> Result<bool, ApiError> {
        match self.users.write().await.get_mut(&id) {
            Some(user) => {
                user.is_active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, id: SubjectId) -> Result<bool, ApiError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn list(&self) -> Result<Vec<UserRecord>, ApiError> {
        let mut users: Vec<UserRecord> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }
}
