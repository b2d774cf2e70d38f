use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Call control
        .route("/calls", post(handlers::start_call))
        .route("/calls/:call_id/inject", post(handlers::inject_question))
        .route("/calls/:call_id/actions", post(handlers::add_action))
        .route("/calls/:call_id/end", post(handlers::end_call))
        // Call queries
        .route("/calls/:call_id/status", get(handlers::get_call_status))
        .route(
            "/calls/:call_id/transcript",
            get(handlers::get_call_transcript),
        )
        .route(
            "/calls/:call_id/questions",
            get(handlers::get_call_questions),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
