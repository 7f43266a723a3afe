//! Axum router configuration

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::handlers::{cache_stats, health_check, serve_request, version_check};

/// Create the Axum router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let response_timeout = state.config().response_timeout();

    Router::new()
        // Status endpoints
        .route("/_status/health", get(health_check))
        .route("/_status/version", get(version_check))
        .route("/_status/cache", get(cache_stats))
        // Resource tree and bound handlers
        .fallback(serve_request)
        // Middleware
        .layer(TimeoutLayer::new(response_timeout))
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
