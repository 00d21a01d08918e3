use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::crypto::{hash_password, verify_password};
use crate::db::UserRepository;
use crate::error::AppError;

const MAX_USERNAME_LEN: usize = 64;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
}

/// Validate and trim username
fn validate_username(username: &str) -> Result<&str, AppError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(AppError::Validation("Username and password are required".to_string()));
    }

    if trimmed.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::Validation(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }

    if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(AppError::Validation(
            "Username must not contain whitespace".to_string(),
        ));
    }

    Ok(trimmed)
}

/// POST /api/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let Json(req) = payload?;

    let username = validate_username(&req.username)?;
    if req.password.is_empty() {
        return Err(AppError::Validation("Username and password are required".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    let user = UserRepository::create(&state.db, username, &password_hash).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            username: user.username,
        }),
    ))
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(req) = payload?;

    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("Username and password are required".to_string()));
    }

    // Unknown user and wrong password are deliberately indistinguishable
    let user = UserRepository::get_by_username(&state.db, username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&user.password_hash, &req.password)? {
        tracing::debug!(user_id = %user.id, "Password mismatch");
        return Err(AppError::InvalidCredentials);
    }

    let issued = state.authenticator.issue(&user).await?;
    UserRepository::touch_last_seen(&state.db, &user.id).await?;

    tracing::info!(user_id = %user.id, scheme = ?state.authenticator.scheme(), "User logged in");

    Ok(Json(LoginResponse {
        token: issued.token,
        expires_in: issued.expires_in,
    }))
}
