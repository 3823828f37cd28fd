//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations the materializer
//! needs: identify, crop, fill, and compress.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend) on top of the `image`
//! crate. Tests use the recording [`MockBackend`](tests::MockBackend).

use super::params::{CompressParams, CropParams, FillParams};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Intrinsic format of an asset, detected from its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    WebP,
    /// Anything the backend cannot decode. Copied through untouched.
    Other,
}

impl ImageKind {
    /// Format name used as the stored file extension, `None` for [`ImageKind::Other`].
    pub fn name(self) -> Option<&'static str> {
        match self {
            ImageKind::Jpeg => Some("jpeg"),
            ImageKind::Png => Some("png"),
            ImageKind::Gif => Some("gif"),
            ImageKind::WebP => Some("webp"),
            ImageKind::Other => None,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().unwrap_or("unknown"))
    }
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub kind: ImageKind,
    /// `None` when the header could not be read.
    pub dimensions: Option<Dimensions>,
}

/// Trait for image processing backends.
///
/// Outputs keep the source format: a cropped GIF is still an animated GIF.
pub trait ImageBackend {
    /// Detect format and dimensions.
    fn identify(&self, path: &Path) -> Result<ImageInfo, BackendError>;

    /// Cut a region out of the source.
    fn crop(&self, params: &CropParams) -> Result<(), BackendError>;

    /// Resize to cover the target size, trimming the overflow.
    fn fill(&self, params: &FillParams) -> Result<(), BackendError>;

    /// Re-encode for publishing.
    fn compress(&self, params: &CompressParams) -> Result<(), BackendError>;
}
