//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the materializer (which decides what happens to an
//! asset) and the [`backend`](super::backend) (which does the pixel work),
//! so tests can swap in a recording mock.

use super::calculations::CropRegion;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Cut `region` out of `source`, keeping the source format.
#[derive(Debug, Clone, PartialEq)]
pub struct CropParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub region: CropRegion,
}

/// Resize `source` to cover `width` × `height`, cropping the overflow.
#[derive(Debug, Clone, PartialEq)]
pub struct FillParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Re-encode `source` with its format's compression settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressParams {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Applies to JPEG only.
    pub quality: Quality,
}
