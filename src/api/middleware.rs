use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::api::state::AppState;
use crate::auth::resolve_identity;
use crate::error::AppError;

/// Authentication middleware - resolves the caller and stores their `Identity`
/// in the request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = resolve_identity(&state.authenticator, request.headers()).await?;

    tracing::debug!(user_id = %identity.user_id, "Request authenticated");
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
