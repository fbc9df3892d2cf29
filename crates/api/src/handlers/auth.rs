//! Handlers for the `/api/auth` resource (register, login, refresh).

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use bookhub_core::error::CoreError;
use bookhub_db::models::user::{CreateUser, User, UserResponse};
use bookhub_db::repositories::UserRepo;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::jwt::{decode_ignoring_expiry, generate_token};
use crate::auth::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::error::{AppError, AppResult, AuthReason};
use crate::state::AppState;

/// Minimum accepted username length at registration.
const MIN_USERNAME_LEN: usize = 3;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/auth/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request body for `POST /api/auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Token plus public user fields, the shape both login and register return.
fn auth_payload(token: String, user: User) -> Value {
    json!({
        "token": token,
        "user": UserResponse::from(user),
    })
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let (Some(username), Some(email), Some(password)) =
        (input.username, input.email, input.password)
    else {
        return Err(CoreError::Validation("All fields are required".into()).into());
    };

    let username = username.trim().to_string();
    let email = email.trim().to_string();

    if username.len() < MIN_USERNAME_LEN {
        return Err(CoreError::Validation(format!(
            "Username must be at least {MIN_USERNAME_LEN} characters"
        ))
        .into());
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(CoreError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ))
        .into());
    }
    if email.is_empty() {
        return Err(CoreError::Validation("Email is required".into()).into());
    }

    if UserRepo::find_by_username(&state.pool, &username)
        .await?
        .is_some()
    {
        return Err(CoreError::Validation("This username already exists".into()).into());
    }
    if UserRepo::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(CoreError::Validation("This email already exists".into()).into());
    }

    let password_hash = hash_password(&password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    // Deterministic avatar per username, same generator the mobile app uses.
    let profile_image = format!("https://api.dicebear.com/7.x/avataaars/svg?seed={username}");

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username,
            email,
            password_hash,
            profile_image,
        },
    )
    .await?;

    let token = generate_token(user.id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    tracing::info!(user_id = user.id, "user registered");

    Ok((StatusCode::CREATED, Json(auth_payload(token, user))))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<Value>> {
    let (Some(email), Some(password)) = (input.email, input.password) else {
        return Err(CoreError::Validation("All fields are required".into()).into());
    };

    // One message for both unknown email and wrong password, so login
    // probing cannot tell them apart.
    let invalid = || AppError::BadRequest("Invalid credentials".into());

    let user = UserRepo::find_by_email(&state.pool, email.trim())
        .await?
        .ok_or_else(invalid)?;

    let password_valid = verify_password(&password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(invalid());
    }

    let token = generate_token(user.id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    tracing::info!(user_id = user.id, "user logged in");

    Ok(Json(auth_payload(token, user)))
}

/// POST /api/auth/refresh
///
/// Re-issues a token from a bearer token whose signature checks out even
/// if its expiry has passed, as long as the user still exists.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized {
            reason: AuthReason::Missing,
            message: "No token provided".into(),
        })?;

    let claims =
        decode_ignoring_expiry(token, &state.config.jwt).map_err(|_| AppError::Unauthorized {
            reason: AuthReason::Invalid,
            message: "Invalid token format".into(),
        })?;

    let user = UserRepo::find_by_id(&state.pool, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized {
            reason: AuthReason::Invalid,
            message: "User no longer exists".into(),
        })?;

    let new_token = generate_token(user.id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let mut payload = auth_payload(new_token, user);
    payload["success"] = json!(true);
    Ok(Json(payload))
}
