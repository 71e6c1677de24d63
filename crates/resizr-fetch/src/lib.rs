//! Origin image fetcher for Resizr.

pub mod client;

pub use client::{FetchConfig, HttpFetcher};
