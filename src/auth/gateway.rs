use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use crate::auth::{AuthError, Authenticator, Identity};
use crate::error::AppError;

pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Pull the presented credential out of the request headers.
///
/// `X-Session-Token` wins; otherwise `Authorization: Bearer <token>`.
pub fn extract_credential(headers: &HeaderMap) -> Option<String> {
    let dedicated = headers
        .get(SESSION_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = dedicated {
        return Some(token.to_string());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Resolve the caller behind `headers`.
///
/// Missing, expired, invalid and unknown credentials all surface as
/// `AppError::Unauthenticated`; store failures stay internal errors.
pub async fn resolve_identity(
    authenticator: &Authenticator,
    headers: &HeaderMap,
) -> Result<Identity, AppError> {
    let credential = extract_credential(headers).ok_or(AuthError::MissingCredential)?;
    let identity = authenticator.resolve(&credential).await?;
    Ok(identity)
}
