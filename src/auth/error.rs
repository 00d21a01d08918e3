use thiserror::Error;

use crate::error::AppError;

/// Why a credential could not be resolved. Only `Store` escapes the gateway
/// as-is; every other variant collapses into `AppError::Unauthenticated`.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credential presented")]
    MissingCredential,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("session not found")]
    SessionNotFound,

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(inner) => inner,
            AuthError::Signing(msg) => AppError::Internal(msg),
            other => AppError::Unauthenticated(other.to_string()),
        }
    }
}
