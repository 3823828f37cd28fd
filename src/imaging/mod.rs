//! Image processing — pure Rust via the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::guess_format` + `ImageReader::into_dimensions` |
//! | **Crop** | `DynamicImage::crop_imm` (every frame for GIF) |
//! | **Fit** | `DynamicImage::resize_to_fill`, Lanczos3 |
//! | **Compress** | per-format encoders: JPEG quality, PNG best, GIF frames, WebP passthrough |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for aspect-ratio math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
pub mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, ImageInfo, ImageKind};
pub use calculations::{AspectRatio, CropRegion, centered_crop, fit_dimensions};
pub use params::{CompressParams, CropParams, FillParams, Quality};
pub use rust_backend::RustBackend;
