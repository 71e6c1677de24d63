//! Crop-then-scale geometry.
//!
//! When both target axes are set and the aspect ratios differ, the source is
//! cropped to a centered band on the axis that is relatively too long, then
//! scaled to the exact target. When one axis is zero it is derived from the
//! source aspect ratio and nothing is cropped.

use resizr_core::{CropRect, Error, ResizePlan, Result, Size};

/// Compute the crop rectangle and output size for `source` resized to
/// `target`. A zero target axis means "derive from the other axis".
pub fn plan_resize(source: Size, target: Size) -> Result<ResizePlan> {
    if target.width == 0 && target.height == 0 {
        return Err(Error::InvalidDimensions {
            width: target.width,
            height: target.height,
        });
    }
    if source.width == 0 || source.height == 0 {
        return Err(Error::Decode(format!("source image has no pixels ({})", source)));
    }

    let (src_w, src_h) = (f64::from(source.width), f64::from(source.height));
    let (dst_w, dst_h) = (f64::from(target.width), f64::from(target.height));

    if target.width == 0 {
        let width = round_half_up((dst_h / src_h) * src_w).max(1);
        return Ok(ResizePlan {
            source,
            crop: None,
            output: Size::new(width, target.height),
        });
    }
    if target.height == 0 {
        let height = round_half_up((dst_w / src_w) * src_h).max(1);
        return Ok(ResizePlan {
            source,
            crop: None,
            output: Size::new(target.width, height),
        });
    }

    // src_w / src_h > dst_w / dst_h, compared without rounding
    let source_is_wider = u64::from(source.width) * u64::from(target.height)
        > u64::from(target.width) * u64::from(source.height);

    let crop = if source_is_wider {
        let scale = dst_h / src_h;
        let keep_width = round_half_up(dst_w / scale).max(1);
        let delta = i64::from(source.width) - i64::from(keep_width);
        (delta >= 1).then(|| CropRect {
            x: (delta / 2) as u32,
            y: 0,
            width: keep_width,
            height: source.height,
        })
    } else {
        let scale = dst_w / src_w;
        let keep_height = round_half_up(dst_h / scale).max(1);
        let delta = i64::from(source.height) - i64::from(keep_height);
        (delta >= 1).then(|| CropRect {
            x: 0,
            y: (delta / 2) as u32,
            width: source.width,
            height: keep_height,
        })
    };

    Ok(ResizePlan {
        source,
        crop,
        output: target,
    })
}

/// Upper bounds on output size, enforced before any pixel buffer is
/// allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeLimits {
    /// Longest allowed output edge. JPEG cannot exceed 65535.
    pub max_dimension: u32,
    /// Largest allowed `width * height` of the output.
    pub max_pixels: u64,
}

impl Default for ResizeLimits {
    fn default() -> Self {
        Self {
            max_dimension: 8192,
            max_pixels: 40_000_000,
        }
    }
}

impl ResizeLimits {
    /// Reject `size` if either axis or the pixel count is over the limit.
    /// Zero axes pass; they are derived later.
    pub fn check(&self, size: Size) -> Result<()> {
        let pixels = u64::from(size.width) * u64::from(size.height);
        if size.width > self.max_dimension
            || size.height > self.max_dimension
            || pixels > self.max_pixels
        {
            return Err(Error::InvalidDimensions {
                width: size.width,
                height: size.height,
            });
        }
        Ok(())
    }
}

/// [`plan_resize`], then reject plans whose output exceeds `limits`.
pub fn plan_resize_within(
    source: Size,
    target: Size,
    limits: &ResizeLimits,
) -> Result<ResizePlan> {
    limits.check(target)?;
    let plan = plan_resize(source, target)?;
    limits.check(plan.output)?;
    Ok(plan)
}

fn round_half_up(value: f64) -> u32 {
    (value + 0.5).floor() as u32
}
