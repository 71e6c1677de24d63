//! Liveness and readiness endpoints.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    /// Cache entries being filled right now.
    pub fills_in_flight: usize,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        fills_in_flight: state.pipeline.fills_in_flight(),
    })
}

/// 200 once the cache directory is usable, 503 otherwise.
pub async fn ready(State(state): State<Arc<AppState>>) -> StatusCode {
    match state.pipeline.check_ready().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            warn!(error = %e, "Cache store not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
