//! Handler state.

use crate::pipeline::Pipeline;
use std::sync::Arc;

/// Shared by every request; the pipeline owns the cache, fetcher and engine.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}
