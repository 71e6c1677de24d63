//! HTTP server and request pipeline for Resizr.

pub mod handlers;
pub mod inflight;
pub mod middleware;
pub mod pipeline;
pub mod routes;
pub mod state;

#[cfg(test)]
mod test_support;

pub use pipeline::{Pipeline, Served, Stage};
pub use routes::{build_app, create_router};
pub use state::AppState;
