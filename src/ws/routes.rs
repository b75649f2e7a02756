use super::handler;
use super::state::AppState;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// Create the HTTP router: the streaming endpoint plus health
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/stt/stream", get(handler::stt_stream))
        .route("/health", get(handler::health_check))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
