//! Resize geometry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Region of the source image kept before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// What the transformer is asked to do with one source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizePlan {
    /// Size of the decoded source.
    pub source: Size,
    /// Centered crop applied before scaling; `None` keeps the whole source.
    pub crop: Option<CropRect>,
    /// Exact dimensions of the encoded output.
    pub output: Size,
}

impl ResizePlan {
    /// Size of the region that gets scaled to `output`.
    pub fn region(&self) -> Size {
        self.crop.map(|c| c.size()).unwrap_or(self.source)
    }

    /// True when the scaled region already has the output size.
    pub fn is_identity_scale(&self) -> bool {
        self.region() == self.output
    }
}
