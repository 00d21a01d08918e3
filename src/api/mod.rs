pub mod auth;
pub mod conversations;
pub mod state;
pub mod middleware;

pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
};
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
    timeout::TimeoutLayer,
};
use std::time::Duration;

pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/conversations", post(conversations::create_conversation))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        // Health check
        .route("/health", get(health))

        // Authentication endpoints
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))

        .merge(protected)

        // Bounds every store call made on behalf of a request
        .layer(TimeoutLayer::new(Duration::from_secs(state.config.request_timeout_secs)))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}
