//! Two-tier image cache for Resizr.
//!
//! Originals and resized variants share one flat directory. The tiers never
//! collide on purpose because their keys are derived from different identity
//! strings: the origin URL for originals, the full request path for variants.

pub mod keys;
pub mod provider;

pub use keys::{CacheKey, CacheTier, derive_key};
pub use provider::FilesystemStore;
