//! Resizr Core
//!
//! Core domain types, traits, and error handling for Resizr.
//! This crate has minimal dependencies and defines the shared vocabulary
//! used across all other crates: the parsed resize request, output formats,
//! resize geometry, and the ports implemented by the cache, fetch and
//! transform crates.

pub mod error;
pub mod format;
pub mod geometry;
pub mod ports;
pub mod request;

pub use error::{Error, ErrorClass, Result};
pub use format::OutputFormat;
pub use geometry::{CropRect, ResizePlan, Size};
pub use request::{ResizeRequest, parse_request};
