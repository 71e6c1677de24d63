//! End-to-end test infrastructure for Resizr.
//!
//! Tests run a real server on an ephemeral port, backed by a temporary cache
//! directory and a wiremock origin.
//!
//! # Usage
//!
//! ```ignore
//! use resizr_tests::{TestServer, fixtures};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let server = TestServer::start().await.unwrap();
//!     let resp = server.client().get("/10x10/http://host/a.png").await.unwrap();
//! }
//! ```

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;

/// Route pipeline logs to the test harness. Safe to call from every test.
pub fn init_test_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn,resizr_api=debug,resizr_cache=debug".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
