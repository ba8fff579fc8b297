//! Account registration, login and lookup.

use crate::config::AdminSeed;
use crate::crypto;
use crate::errors::ApiError;
use crate::models::{LoginRequest, RegisterRequest, UserRecord};
use crate::observability::hash_for_correlation;
use crate::repositories::UserRepository;
use chrono::Utc;
use common::secret::ExposeSecret;
use common::types::{Role, SubjectId, UserProfile, UserView};
use tracing::instrument;

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 20;
const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_NAME_LENGTH: usize = 50;
const MAX_ORGANIZATION_LENGTH: usize = 200;
const MAX_POSITION_LENGTH: usize = 100;

/// Register a new account with the `user` role.
///
/// # Steps
///
/// 1. Validate username (3-20 chars), email format, password (min 6 chars)
/// 2. Normalize email (trim, lower-case) and profile fields (trim)
/// 3. Hash password with bcrypt
/// 4. Insert (fails on duplicate email or username)
#[instrument(skip_all)]
pub async fn register(
    users: &dyn UserRepository,
    bcrypt_cost: u32,
    request: RegisterRequest,
) -> Result<UserRecord, ApiError> {
    let username = request.username.trim().to_string();
    let username_len = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&username_len) {
        return Err(ApiError::BadRequest(format!(
            "Username must be between {} and {} characters",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        )));
    }

    let email = normalize_email(&request.email);
    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email format".to_string()));
    }

    let password = request.password.expose_secret();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let profile = normalize_profile(request.profile.unwrap_or_default())?;
    let password_hash = crypto::hash_password(password, bcrypt_cost)?;

    let user = users
        .insert(UserRecord {
            id: SubjectId::new(),
            username,
            email,
            password_hash,
            role: Role::User,
            profile,
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
        })
        .await?;

    tracing::info!(
        target: "session.services.user",
        subject = %hash_for_correlation(&user.id.to_string()),
        "Account registered"
    );

    Ok(user)
}

/// Check credentials and record the login time.
///
/// Unknown email and wrong password are indistinguishable to the caller.
/// A deactivated account is only reported once the password matched.
#[instrument(skip_all)]
pub async fn login(
    users: &dyn UserRepository,
    request: LoginRequest,
) -> Result<UserRecord, ApiError> {
    let email = normalize_email(&request.email);

    let Some(mut user) = users.find_by_email(&email).await? else {
        tracing::debug!(target: "session.services.user", "Login rejected: unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !crypto::verify_password(request.password.expose_secret(), &user.password_hash)? {
        tracing::debug!(
            target: "session.services.user",
            subject = %hash_for_correlation(&user.id.to_string()),
            "Login rejected: wrong password"
        );
        return Err(ApiError::InvalidCredentials);
    }

    if !user.is_active {
        tracing::info!(
            target: "session.services.user",
            subject = %hash_for_correlation(&user.id.to_string()),
            "Login rejected: account deactivated"
        );
        return Err(ApiError::AccountDisabled);
    }

    let now = Utc::now();
    users.update_last_login(user.id, now).await?;
    user.last_login = Some(now);

    Ok(user)
}

/// Public view of an account, or `IdentityNotFound` when it vanished.
#[instrument(skip_all)]
pub async fn profile(users: &dyn UserRepository, id: SubjectId) -> Result<UserView, ApiError> {
    users
        .find_by_id(id)
        .await?
        .map(|u| u.to_view())
        .ok_or(ApiError::IdentityNotFound)
}

/// All accounts as public views.
pub async fn list(users: &dyn UserRepository) -> Result<Vec<UserView>, ApiError> {
    Ok(users.list().await?.iter().map(UserRecord::to_view).collect())
}

/// Create the configured admin account unless the email is already taken.
///
/// Returns whether an account was created.
#[instrument(skip_all)]
pub async fn seed_admin(
    users: &dyn UserRepository,
    bcrypt_cost: u32,
    seed: &AdminSeed,
) -> Result<bool, ApiError> {
    let email = normalize_email(&seed.email);
    if users.find_by_email(&email).await?.is_some() {
        tracing::debug!(target: "session.services.user", "Admin account already present");
        return Ok(false);
    }

    let password_hash = crypto::hash_password(seed.password.expose_secret(), bcrypt_cost)?;
    let admin = users
        .insert(UserRecord {
            id: SubjectId::new(),
            username: seed.username.clone(),
            email,
            password_hash,
            role: Role::Admin,
            profile: UserProfile::default(),
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
        })
        .await?;

    tracing::info!(
        target: "session.services.user",
        subject = %hash_for_correlation(&admin.id.to_string()),
        "Admin account seeded"
    );

    Ok(true)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// `local@domain.tld`: one `@`, no whitespace, a dot in the domain, no
/// empty labels.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

fn normalize_profile(profile: UserProfile) -> Result<UserProfile, ApiError> {
    let profile = UserProfile {
        first_name: trim_field(profile.first_name),
        last_name: trim_field(profile.last_name),
        phone: trim_field(profile.phone),
        organization: trim_field(profile.organization),
        position: trim_field(profile.position),
    };

    check_length("First name", profile.first_name.as_deref(), MAX_NAME_LENGTH)?;
    check_length("Last name", profile.last_name.as_deref(), MAX_NAME_LENGTH)?;
    check_length(
        "Organization",
        profile.organization.as_deref(),
        MAX_ORGANIZATION_LENGTH,
    )?;
    check_length("Position", profile.position.as_deref(), MAX_POSITION_LENGTH)?;

    Ok(profile)
}

fn trim_field(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_length(field: &str, value: Option<&str>, max: usize) -> Result<(), ApiError> {
    match value {
        Some(v) if v.chars().count() > max => Err(ApiError::BadRequest(format!(
            "{} cannot exceed {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}
