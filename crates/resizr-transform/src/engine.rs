//! Resize engine.

use bytes::Bytes;
use resizr_core::ports::ImageTransformer;
use resizr_core::{Error, OutputFormat, Result, Size};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::fir::FirTransformer;
use crate::plan::{ResizeLimits, plan_resize_within};

/// Compression quality for lossy outputs when none is configured.
pub const DEFAULT_JPEG_QUALITY: u8 = 70;

/// Plans and runs resizes, one at a time.
///
/// The transformer is not assumed to be safe for concurrent use, so every
/// call goes through `lock`. The guard travels with the blocking task and is
/// released only when the transform returns, even if the caller has gone
/// away. Share one engine per process.
pub struct ResizeEngine {
    transformer: Arc<dyn ImageTransformer>,
    quality: u8,
    limits: ResizeLimits,
    lock: Arc<Mutex<()>>,
}

impl ResizeEngine {
    pub fn new(transformer: Arc<dyn ImageTransformer>, quality: u8) -> Self {
        Self {
            transformer,
            quality: quality.clamp(1, 100),
            limits: ResizeLimits::default(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Engine backed by [`FirTransformer`].
    pub fn with_quality(quality: u8) -> Self {
        Self::new(Arc::new(FirTransformer::new()), quality)
    }

    pub fn with_limits(mut self, limits: ResizeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn limits(&self) -> &ResizeLimits {
        &self.limits
    }

    /// Reject a requested size before any work is done for it.
    pub fn check_target(&self, target: Size) -> Result<()> {
        if target.width == 0 && target.height == 0 {
            return Err(Error::InvalidDimensions {
                width: 0,
                height: 0,
            });
        }
        self.limits.check(target)
    }

    /// Resize `source` to `target` and encode it as `format`.
    pub async fn resize(
        &self,
        source: Bytes,
        target: Size,
        format: OutputFormat,
    ) -> Result<Vec<u8>> {
        self.check_target(target)?;

        let guard = Arc::clone(&self.lock).lock_owned().await;
        let started = Instant::now();
        let transformer = Arc::clone(&self.transformer);
        let quality = self.quality;
        let limits = self.limits;

        let (plan, output) = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let plan = plan_resize_within(transformer.source_size(&source)?, target, &limits)?;
            debug!(
                source = %plan.source,
                crop = ?plan.crop,
                output = %plan.output,
                "Planned resize"
            );
            let output = transformer.apply(&source, &plan, format, quality)?;
            Ok::<_, Error>((plan, output))
        })
        .await
        .map_err(|e| Error::Internal(format!("resize task failed: {}", e)))??;

        info!(
            source = %plan.source,
            output = %plan.output,
            cropped = plan.crop.is_some(),
            format = %format,
            bytes = output.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Resized image"
        );
        Ok(output)
    }
}

impl Default for ResizeEngine {
    fn default() -> Self {
        Self::with_quality(DEFAULT_JPEG_QUALITY)
    }
}
