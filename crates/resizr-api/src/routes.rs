//! Route definitions.

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, images};
use crate::middleware;
use crate::state::AppState;

/// Create the router: health endpoints plus the image handler on every other
/// path.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .fallback(images::serve_image)
        .with_state(state)
}

/// Router with request IDs, tracing and CORS applied.
pub fn build_app(state: Arc<AppState>) -> Router {
    create_router(state)
        .layer(axum::middleware::from_fn(middleware::request_id))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors_layer())
}
