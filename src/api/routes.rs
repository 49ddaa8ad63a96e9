//! HTTP API route definitions.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::docs::{serve_docs, serve_spec};
use super::handlers::{health, render_metrics, AppState};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(health))
        // Documentation
        .route("/openapi.yaml", get(serve_spec))
        .route("/docs", get(serve_docs))
        .route("/docs/{*rest}", get(serve_docs))
        // Metrics
        .route("/metrics", get(render_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
