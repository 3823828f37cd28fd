//! Turning a remote image reference into a published local file.
//!
//! ```text
//! fetch ──► <temp>/<uuid>.<url-ext> ──► identify ──► [cover correction] ──► compress ──► <images>/<uuid>.<format>
//! ```
//!
//! The stored extension follows the format detected from the bytes, never the
//! URL. A cover whose ratio differs from `images.cover.aspect_ratio` can be
//! corrected (centered crop or fill) after two confirmations: one to apply the
//! correction, one to keep the result after reviewing it.

use crate::config::{CoverStrategy, ImagesConfig};
use crate::fetch::{FetchError, Fetcher};
use crate::imaging::{
    AspectRatio, BackendError, CompressParams, CropParams, Dimensions, FillParams, ImageBackend,
    ImageKind, Quality, centered_crop, fit_dimensions,
};
use crate::prompt::Prompter;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("download failed: {0}")]
    Download(#[from] FetchError),
    #[error("encode failed: {0}")]
    Encode(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    Cover,
    Inline,
}

/// A published image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedImage {
    /// Bare filename, as recorded in the manifest.
    pub file_name: String,
    /// Public URL that replaces the remote one in the document.
    pub local_url: String,
    pub kind: ImageKind,
    /// Whether the cover ratio correction was applied.
    pub corrected: bool,
}

/// Where materialized files go.
#[derive(Debug, Clone)]
pub struct Destination {
    pub temp_dir: PathBuf,
    pub image_dir: PathBuf,
    pub url_prefix: String,
}

pub struct Materializer<'a> {
    pub fetcher: &'a dyn Fetcher,
    pub backend: &'a dyn ImageBackend,
    pub prompter: &'a dyn Prompter,
    pub config: &'a ImagesConfig,
    pub destination: Destination,
}

impl Materializer<'_> {
    pub fn materialize(
        &self,
        url: &str,
        role: ImageRole,
    ) -> Result<MaterializedImage, MaterializeError> {
        let bytes = self.fetcher.fetch(url)?;
        let id = Uuid::new_v4().to_string();
        let url_ext = url_extension(url);

        fs::create_dir_all(&self.destination.temp_dir)?;
        let working = self
            .destination
            .temp_dir
            .join(file_name(&id, url_ext.as_deref()));
        fs::write(&working, &bytes)?;

        let info = self.backend.identify(&working)?;
        debug!(url, kind = %info.kind, dimensions = ?info.dimensions, "downloaded image");

        let corrected = match (role, info.kind.name(), info.dimensions) {
            (ImageRole::Cover, Some(ext), Some(dims)) => {
                self.correct_cover(&working, &id, ext, dims)?
            }
            _ => false,
        };

        let stored_name = file_name(&id, info.kind.name().or(url_ext.as_deref()));
        fs::create_dir_all(&self.destination.image_dir)?;
        self.backend.compress(&CompressParams {
            source: working,
            output: self.destination.image_dir.join(&stored_name),
            quality: Quality::new(self.config.jpeg_quality),
        })?;

        Ok(MaterializedImage {
            local_url: format!(
                "{}/{}",
                self.destination.url_prefix.trim_end_matches('/'),
                stored_name
            ),
            file_name: stored_name,
            kind: info.kind,
            corrected,
        })
    }

    /// Offer to fix the cover ratio in place. Returns whether `working` was replaced.
    fn correct_cover(
        &self,
        working: &Path,
        id: &str,
        ext: &str,
        dims: Dimensions,
    ) -> Result<bool, MaterializeError> {
        let cover = &self.config.cover;
        let ratio = AspectRatio::from(cover.aspect_ratio);
        if ratio.matches(dims) {
            return Ok(false);
        }

        let action = match cover.strategy {
            CoverStrategy::Crop => "Crop",
            CoverStrategy::Fit => "Resize",
        };
        let question = format!(
            "Cover is {}x{}, target ratio is {}:{}. {action} it?",
            dims.width, dims.height, ratio.width, ratio.height
        );
        if !self.prompter.confirm(&question)? {
            return Ok(false);
        }

        let fixed = self.destination.temp_dir.join(format!("{id}_fit.{ext}"));
        match cover.strategy {
            CoverStrategy::Crop => self.backend.crop(&CropParams {
                source: working.to_path_buf(),
                output: fixed.clone(),
                region: centered_crop(dims, ratio),
            })?,
            CoverStrategy::Fit => {
                let (width, height) = fit_dimensions(ratio, cover.fit_width);
                self.backend.fill(&FillParams {
                    source: working.to_path_buf(),
                    output: fixed.clone(),
                    width,
                    height,
                })?
            }
        }

        let review = format!("Corrected cover written to {}. Keep it?", fixed.display());
        if !self.prompter.confirm(&review)? {
            let _ = fs::remove_file(&fixed);
            return Ok(false);
        }
        fs::rename(&fixed, working)?;
        Ok(true)
    }
}

fn file_name(id: &str, ext: Option<&str>) -> String {
    match ext {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

/// Lowercased extension of the URL's last path segment, if it looks like one.
fn url_extension(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    let ext = Path::new(segment).extension()?.to_str()?;
    let valid = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}
