//! Pure calculation functions for cover aspect-ratio correction.
//!
//! All functions here are pure and testable without any I/O or images.
//! Ratios are compared with integer cross-multiplication so `1200:630` and
//! `40:21` are the same ratio and no float rounding sneaks in.

use super::backend::Dimensions;

/// A width:height ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl From<[u32; 2]> for AspectRatio {
    fn from([width, height]: [u32; 2]) -> Self {
        Self { width, height }
    }
}

impl AspectRatio {
    /// Whether `dims` has exactly this ratio.
    pub fn matches(self, dims: Dimensions) -> bool {
        dims.width as u64 * self.height as u64 == dims.height as u64 * self.width as u64
    }
}

/// A rectangle inside the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// Largest region with the target ratio, centered on both axes.
///
/// With source `W×H` and ratio `R`:
/// - `W/H ≥ R`: width becomes `floor(H·R)`, left offset `floor((W − w)/2)`
/// - otherwise: height becomes `floor(W/R)`, top offset `floor((H − h)/2)`
///
/// The trimmed side never drops below one pixel, so slivers still yield an
/// encodable region.
///
/// # Examples
/// ```
/// # use blog_digest::imaging::{AspectRatio, Dimensions, centered_crop};
/// let region = centered_crop(
///     Dimensions { width: 1600, height: 1000 },
///     AspectRatio { width: 16, height: 9 },
/// );
/// assert_eq!((region.left, region.top, region.width, region.height), (0, 50, 1600, 900));
/// ```
pub fn centered_crop(source: Dimensions, ratio: AspectRatio) -> CropRegion {
    let (w, h) = (source.width as u64, source.height as u64);
    let (rw, rh) = (ratio.width as u64, ratio.height as u64);

    if w * rh >= h * rw {
        // Source is wider (or equal): trim left and right
        let new_w = (h * rw / rh).clamp(1, w.max(1));
        CropRegion {
            left: (w.saturating_sub(new_w) / 2) as u32,
            top: 0,
            width: new_w as u32,
            height: source.height,
        }
    } else {
        // Source is taller: trim top and bottom
        let new_h = (w * rh / rw).clamp(1, h.max(1));
        CropRegion {
            left: 0,
            top: (h.saturating_sub(new_h) / 2) as u32,
            width: source.width,
            height: new_h as u32,
        }
    }
}

/// Output size for the cover-fit strategy: `fit_width` wide at the target ratio.
pub fn fit_dimensions(ratio: AspectRatio, fit_width: u32) -> (u32, u32) {
    let height = (fit_width as f64 * ratio.height as f64 / ratio.width as f64).round() as u32;
    (fit_width, height.max(1))
}
