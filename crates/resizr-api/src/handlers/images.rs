//! Image handler, bound to every path without a dedicated route.

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use resizr_core::{Error, ErrorClass};
use std::sync::Arc;
use tracing::{error, warn};

use crate::state::AppState;

/// Resized variants never change once written.
const CACHE_CONTROL_IMMUTABLE: &str = "public, max-age=31536000, immutable";

pub async fn serve_image(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> Response {
    let path = uri.path();
    if method != Method::GET && method != Method::HEAD {
        return (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET, HEAD")]).into_response();
    }

    match state.pipeline.handle(path).await {
        Ok(served) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, served.content_type),
                (header::CACHE_CONTROL, CACHE_CONTROL_IMMUTABLE),
                (
                    header::HeaderName::from_static("x-cache"),
                    if served.cache_hit { "hit" } else { "miss" },
                ),
            ],
            served.body,
        )
            .into_response(),
        Err(e) => {
            match e.class() {
                ErrorClass::BadRequest => warn!(path = %path, error = %e, "Bad request"),
                ErrorClass::Upstream | ErrorClass::Unprocessable => {
                    warn!(path = %path, error = %e, "Upstream failure")
                }
                ErrorClass::Internal => error!(path = %path, error = %e, "Request failed"),
            }
            status_for(&e).into_response()
        }
    }
}

/// Response status for a failed request. Bodies stay empty.
pub fn status_for(err: &Error) -> StatusCode {
    match err.class() {
        ErrorClass::BadRequest => StatusCode::BAD_REQUEST,
        ErrorClass::Upstream => StatusCode::BAD_GATEWAY,
        ErrorClass::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
