use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Recording control
        .route("/audio/start", post(handlers::start_recording))
        .route("/audio/stop", post(handlers::stop_recording))
        // Session queries
        .route("/audio/status", get(handlers::get_status))
        // Live transcription push channel
        .route("/audio/stream", get(handlers::stream_transcriptions))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
