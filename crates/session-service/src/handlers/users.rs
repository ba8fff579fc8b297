//! Account endpoints behind the session middleware.

use crate::errors::ApiError;
use crate::models::Identity;
use crate::routes::AppState;
use crate::services::user_service;
use axum::{extract::State, Extension, Json};
use common::types::UserView;
use std::sync::Arc;
use tracing::instrument;

/// `GET /api/users/profile`: the authenticated account.
#[instrument(skip_all, name = "session.handlers.get_profile")]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<UserView>, ApiError> {
    let profile = user_service::profile(state.users.as_ref(), identity.subject_id).await?;
    Ok(Json(profile))
}

/// `GET /api/users`: every account. Admin only (enforced by the role gate).
#[instrument(skip_all, name = "session.handlers.list_users")]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    Ok(Json(user_service::list(state.users.as_ref()).await?))
}
