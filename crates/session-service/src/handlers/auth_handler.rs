//! Login, registration, renewal and logout.
//!
//! Successful login, registration and renewal set both session cookies and
//! return the account so the client can update its session state. Logout
//! clears both cookies and needs no session.

use crate::errors::ApiError;
use crate::models::{LoginRequest, RegisterRequest};
use crate::routes::AppState;
use crate::services::{token_service, user_service};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use common::jwt::REFRESH_TOKEN_COOKIE;
use common::types::{AuthResponse, MessageResponse, RefreshResponse};
use std::sync::Arc;
use tracing::instrument;

/// Map body rejections onto the JSON error envelope.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// `POST /api/users/register`
#[instrument(skip_all, name = "session.handlers.register")]
pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    let request = body(payload)?;
    let user =
        user_service::register(state.users.as_ref(), state.config.bcrypt_cost, request).await?;
    let tokens = token_service::issue_session(&state.issuer, &user)?;

    let jar = state
        .cookies
        .set_session(jar, tokens.access_token, tokens.refresh_token);

    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            user: user.to_view(),
        }),
    ))
}

/// `POST /api/users/login`
#[instrument(skip_all, name = "session.handlers.login")]
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let request = body(payload)?;
    let user = user_service::login(state.users.as_ref(), request).await?;
    let tokens = token_service::issue_session(&state.issuer, &user)?;

    let jar = state
        .cookies
        .set_session(jar, tokens.access_token, tokens.refresh_token);

    Ok((
        jar,
        Json(AuthResponse {
            message: "Logged in successfully".to_string(),
            user: user.to_view(),
        }),
    ))
}

/// `POST /api/users/refresh`
///
/// Reads only the refresh cookie. Issues a new pair on success.
#[instrument(skip_all, name = "session.handlers.refresh")]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<RefreshResponse>), ApiError> {
    let refresh_token = jar.get(REFRESH_TOKEN_COOKIE).map(|c| c.value().to_string());

    let (user, tokens) =
        token_service::renew_session(&state.issuer, state.users.as_ref(), refresh_token.as_deref())
            .await?;

    let jar = state
        .cookies
        .set_session(jar, tokens.access_token, tokens.refresh_token);

    Ok((
        jar,
        Json(RefreshResponse {
            message: "Tokens refreshed".to_string(),
            user: Some(user.to_view()),
        }),
    ))
}

/// `POST /api/users/logout`
#[instrument(skip_all, name = "session.handlers.logout")]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    (
        state.cookies.clear_session(jar),
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
}
