//! Crop/scale planning and image transforms for Resizr.
//!
//! - [`plan`]: pure geometry deciding which pixels survive and the output size.
//! - [`fir`]: the production [`ImageTransformer`](resizr_core::ports::ImageTransformer),
//!   decoding/encoding with `image` and resampling with `fast_image_resize`.
//! - [`engine`]: [`ResizeEngine`], which owns the process-wide resize lock.

pub mod engine;
pub mod fir;
pub mod plan;

pub use engine::{DEFAULT_JPEG_QUALITY, ResizeEngine};
pub use fir::FirTransformer;
pub use plan::{ResizeLimits, plan_resize, plan_resize_within};
