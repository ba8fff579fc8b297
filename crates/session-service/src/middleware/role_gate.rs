//! Role gate for role-restricted routes.
//!
//! Runs after [`require_session`](super::session::require_session) and never
//! replaces it. The role carried by the token is ignored: the canonical role
//! is fetched from the identity store on every request, through the
//! [`IdentityLookup`] seam so that a caching implementation can be dropped in
//! without touching the middleware.

use crate::errors::ApiError;
use crate::models::Identity;
use crate::observability::{hash_for_correlation, metrics::record_role_check};
use crate::repositories::UserRepository;
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use common::types::{Role, SubjectId};
use std::sync::Arc;
use tracing::instrument;

/// Source of truth for an identity's current role.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// `Ok(None)` when the identity no longer exists.
    async fn find_role(&self, subject_id: SubjectId) -> Result<Option<Role>, ApiError>;
}

/// [`IdentityLookup`] backed by the user repository.
pub struct UserRoleLookup {
    users: Arc<dyn UserRepository>,
}

impl UserRoleLookup {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl IdentityLookup for UserRoleLookup {
    async fn find_role(&self, subject_id: SubjectId) -> Result<Option<Role>, ApiError> {
        Ok(self.users.find_by_id(subject_id).await?.map(|u| u.role))
    }
}

/// State for one role gate: the lookup and the roles it admits.
#[derive(Clone)]
pub struct RoleGateState {
    pub lookup: Arc<dyn IdentityLookup>,
    pub allowed: Vec<Role>,
}

impl RoleGateState {
    pub fn new(lookup: Arc<dyn IdentityLookup>, allowed: impl Into<Vec<Role>>) -> Self {
        Self {
            lookup,
            allowed: allowed.into(),
        }
    }
}

/// Role gate middleware.
///
/// # Response
///
/// - 401 if no identity was attached (session middleware missing)
/// - 404 if the identity no longer exists
/// - 403 if its role is not in the allowed set
/// - 500 if the lookup fails
/// - Otherwise runs the handler with the resolved role merged into the
///   [`Identity`] extension
#[instrument(skip_all, name = "session.middleware.require_role")]
pub async fn require_role(
    State(state): State<Arc<RoleGateState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(identity) = req.extensions().get::<Identity>().copied() else {
        tracing::warn!(target: "session.role_gate", "Role gate reached without an identity");
        return Err(ApiError::AuthenticationRequired);
    };
    let subject = hash_for_correlation(&identity.subject_id.to_string());

    let role = match state.lookup.find_role(identity.subject_id).await {
        Ok(Some(role)) => role,
        Ok(None) => {
            tracing::info!(
                target: "session.role_gate",
                subject = %subject,
                "Identity no longer exists"
            );
            record_role_check("not_found");
            return Err(ApiError::IdentityNotFound);
        }
        Err(e) => {
            record_role_check("error");
            return Err(ApiError::Internal(format!("Role lookup failed: {e}")));
        }
    };

    if !state.allowed.contains(&role) {
        tracing::info!(
            target: "session.role_gate",
            subject = %subject,
            role = %role,
            "Role not permitted"
        );
        record_role_check("forbidden");
        return Err(ApiError::Forbidden);
    }

    record_role_check("allowed");
    req.extensions_mut().insert(Identity {
        role: Some(role),
        ..identity
    });

    Ok(next.run(req).await)
}

/// Mock identity lookup for testing.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Identity lookup with a fixed role table.
    pub struct MockIdentityLookup {
        roles: HashMap<SubjectId, Role>,
        call_count: AtomicUsize,
        return_error: bool,
    }

    impl MockIdentityLookup {
        pub fn with_roles(roles: impl IntoIterator<Item = (SubjectId, Role)>) -> Self {
            Self {
                roles: roles.into_iter().collect(),
                call_count: AtomicUsize::new(0),
                return_error: false,
            }
        }

        /// A lookup whose store is unreachable.
        pub fn failing() -> Self {
            Self {
                roles: HashMap::new(),
                call_count: AtomicUsize::new(0),
                return_error: true,
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IdentityLookup for MockIdentityLookup {
        async fn find_role(&self, subject_id: SubjectId) -> Result<Option<Role>, ApiError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            if self.return_error {
                return Err(ApiError::Storage("mock identity store unavailable".to_string()));
            }

            Ok(self.roles.get(&subject_id).copied())
        }
    }
}
