//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Detect format | `image::guess_format` (magic bytes) |
//! | Dimensions | `ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, WebP) | `image::load_from_memory` |
//! | Decode / encode GIF | `GifDecoder::into_frames` / `GifEncoder::encode_frames` |
//! | Crop | `DynamicImage::crop_imm` |
//! | Fill | `DynamicImage::resize_to_fill` with `Lanczos3` |
//! | Encode JPEG | `JpegEncoder::new_with_quality` |
//! | Encode PNG | `PngEncoder`, best compression, adaptive filter |
//! | Encode WebP | `WebPEncoder::new_lossless` |
//!
//! Compression passes WebP and unknown formats through byte-for-byte: the
//! `image` crate only ships a lossless WebP encoder, which would grow the file.

use super::backend::{BackendError, Dimensions, ImageBackend, ImageInfo, ImageKind};
use super::params::{CompressParams, CropParams, FillParams, Quality};
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, Frame, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::Path;

/// Quality for intermediate JPEGs written by crop/fill. The final compress
/// pass applies the configured quality.
const INTERMEDIATE_QUALITY: Quality = Quality(95);

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn failed(context: &str, path: &Path, e: impl std::fmt::Display) -> BackendError {
    BackendError::ProcessingFailed(format!("{context} {}: {e}", path.display()))
}

fn detect(bytes: &[u8]) -> ImageKind {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => ImageKind::Jpeg,
        Ok(ImageFormat::Png) => ImageKind::Png,
        Ok(ImageFormat::Gif) => ImageKind::Gif,
        Ok(ImageFormat::WebP) => ImageKind::WebP,
        _ => ImageKind::Other,
    }
}

fn read_dimensions(bytes: &[u8]) -> Option<Dimensions> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()?;
    Some(Dimensions { width, height })
}

fn decode_still(bytes: &[u8], path: &Path) -> Result<DynamicImage, BackendError> {
    image::load_from_memory(bytes).map_err(|e| failed("Failed to decode", path, e))
}

/// Every frame of a GIF, composited to full-canvas RGBA.
fn decode_frames(bytes: &[u8], path: &Path) -> Result<Vec<Frame>, BackendError> {
    let decoder =
        GifDecoder::new(Cursor::new(bytes)).map_err(|e| failed("Failed to decode", path, e))?;
    decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| failed("Failed to decode frames of", path, e))
}

fn map_frames(frames: Vec<Frame>, op: &dyn Fn(&DynamicImage) -> DynamicImage) -> Vec<Frame> {
    frames
        .into_iter()
        .map(|frame| {
            let delay = frame.delay();
            let image = DynamicImage::ImageRgba8(frame.into_buffer());
            Frame::from_parts(op(&image).to_rgba8(), 0, 0, delay)
        })
        .collect()
}

fn save_frames(frames: Vec<Frame>, path: &Path) -> Result<(), BackendError> {
    let writer = BufWriter::new(File::create(path)?);
    let mut encoder = GifEncoder::new(writer);
    encoder
        .set_repeat(Repeat::Infinite)
        .map_err(|e| failed("Failed to encode", path, e))?;
    encoder
        .encode_frames(frames)
        .map_err(|e| failed("Failed to encode", path, e))
}

fn save_still(
    img: &DynamicImage,
    kind: ImageKind,
    path: &Path,
    quality: Quality,
) -> Result<(), BackendError> {
    let writer = BufWriter::new(File::create(path)?);
    let result = match kind {
        ImageKind::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(writer, quality.value() as u8))
        }
        ImageKind::Png => img.write_with_encoder(PngEncoder::new_with_quality(
            writer,
            CompressionType::Best,
            PngFilter::Adaptive,
        )),
        ImageKind::WebP => DynamicImage::ImageRgba8(img.to_rgba8())
            .write_with_encoder(WebPEncoder::new_lossless(writer)),
        ImageKind::Gif | ImageKind::Other => {
            return Err(failed("No still encoder for", path, kind));
        }
    };
    result.map_err(|e| failed("Failed to encode", path, e))
}

impl RustBackend {
    /// Apply `op` to every frame (GIF) or the single image, keeping the format.
    fn transform(
        &self,
        source: &Path,
        output: &Path,
        op: &dyn Fn(&DynamicImage) -> DynamicImage,
    ) -> Result<(), BackendError> {
        let bytes = std::fs::read(source)?;
        match detect(&bytes) {
            ImageKind::Gif => save_frames(map_frames(decode_frames(&bytes, source)?, op), output),
            ImageKind::Other => Err(failed("Unsupported format", source, "not an image")),
            kind => {
                let img = decode_still(&bytes, source)?;
                save_still(&op(&img), kind, output, INTERMEDIATE_QUALITY)
            }
        }
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<ImageInfo, BackendError> {
        let bytes = std::fs::read(path)?;
        let kind = detect(&bytes);
        let dimensions = match kind {
            ImageKind::Other => None,
            _ => read_dimensions(&bytes),
        };
        Ok(ImageInfo { kind, dimensions })
    }

    fn crop(&self, params: &CropParams) -> Result<(), BackendError> {
        let r = params.region;
        self.transform(&params.source, &params.output, &|img: &DynamicImage| {
            img.crop_imm(r.left, r.top, r.width, r.height)
        })
    }

    fn fill(&self, params: &FillParams) -> Result<(), BackendError> {
        let (width, height) = (params.width, params.height);
        self.transform(&params.source, &params.output, &|img: &DynamicImage| {
            img.resize_to_fill(width, height, FilterType::Lanczos3)
        })
    }

    fn compress(&self, params: &CompressParams) -> Result<(), BackendError> {
        let bytes = std::fs::read(&params.source)?;
        match detect(&bytes) {
            ImageKind::Gif => save_frames(decode_frames(&bytes, &params.source)?, &params.output),
            ImageKind::WebP | ImageKind::Other => {
                std::fs::write(&params.output, &bytes)?;
                Ok(())
            }
            kind => {
                let img = decode_still(&bytes, &params.source)?;
                save_still(&img, kind, &params.output, params.quality)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::CropRegion;
    use crate::test_helpers::{gif_bytes, jpeg_bytes, png_bytes};

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn gif_frame_count(path: &Path) -> usize {
        let bytes = std::fs::read(path).unwrap();
        decode_frames(&bytes, path).unwrap().len()
    }

    #[test]
    fn identify_detects_format_from_bytes() {
        let tmp = tempfile::TempDir::new().unwrap();
        // Extension lies; content wins
        let path = write(tmp.path(), "photo.gif", &png_bytes(40, 30));

        let info = RustBackend::new().identify(&path).unwrap();
        assert_eq!(info.kind, ImageKind::Png);
        assert_eq!(
            info.dimensions,
            Some(Dimensions {
                width: 40,
                height: 30
            })
        );
    }

    #[test]
    fn identify_unknown_bytes_is_other() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = write(tmp.path(), "notes.bin", b"definitely not an image");

        let info = RustBackend::new().identify(&path).unwrap();
        assert_eq!(info.kind, ImageKind::Other);
        assert_eq!(info.dimensions, None);
    }

    #[test]
    fn identify_nonexistent_file_errors() {
        let result = RustBackend::new().identify(Path::new("/nonexistent/image.jpg"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn crop_jpeg_to_region() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = write(tmp.path(), "src", &jpeg_bytes(160, 100));
        let output = tmp.path().join("out.jpeg");

        let backend = RustBackend::new();
        backend
            .crop(&CropParams {
                source,
                output: output.clone(),
                region: CropRegion {
                    left: 0,
                    top: 5,
                    width: 160,
                    height: 90,
                },
            })
            .unwrap();

        let info = backend.identify(&output).unwrap();
        assert_eq!(info.kind, ImageKind::Jpeg);
        assert_eq!(
            info.dimensions,
            Some(Dimensions {
                width: 160,
                height: 90
            })
        );
    }

    #[test]
    fn crop_gif_keeps_every_frame() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = write(tmp.path(), "src", &gif_bytes(20, 20, 3));
        let output = tmp.path().join("out.gif");

        let backend = RustBackend::new();
        backend
            .crop(&CropParams {
                source,
                output: output.clone(),
                region: CropRegion {
                    left: 2,
                    top: 0,
                    width: 16,
                    height: 20,
                },
            })
            .unwrap();

        let info = backend.identify(&output).unwrap();
        assert_eq!(info.kind, ImageKind::Gif);
        assert_eq!(
            info.dimensions,
            Some(Dimensions {
                width: 16,
                height: 20
            })
        );
        assert_eq!(gif_frame_count(&output), 3);
    }

    #[test]
    fn crop_sliver_png_to_centered_region() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = write(tmp.path(), "src", &png_bytes(1, 100));
        let output = tmp.path().join("out.png");
        let region = crate::imaging::centered_crop(
            Dimensions {
                width: 1,
                height: 100,
            },
            crate::imaging::AspectRatio {
                width: 1200,
                height: 630,
            },
        );

        let backend = RustBackend::new();
        backend
            .crop(&CropParams {
                source,
                output: output.clone(),
                region,
            })
            .unwrap();

        let info = backend.identify(&output).unwrap();
        assert_eq!(
            info.dimensions,
            Some(Dimensions {
                width: 1,
                height: 1
            })
        );
    }

    #[test]
    fn fill_png_exact_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = write(tmp.path(), "src", &png_bytes(64, 64));
        let output = tmp.path().join("out.png");

        let backend = RustBackend::new();
        backend
            .fill(&FillParams {
                source,
                output: output.clone(),
                width: 120,
                height: 63,
            })
            .unwrap();

        let info = backend.identify(&output).unwrap();
        assert_eq!(info.kind, ImageKind::Png);
        assert_eq!(
            info.dimensions,
            Some(Dimensions {
                width: 120,
                height: 63
            })
        );
    }

    #[test]
    fn crop_unknown_format_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = write(tmp.path(), "src", b"plain text");

        let result = RustBackend::new().crop(&CropParams {
            source,
            output: tmp.path().join("out"),
            region: CropRegion {
                left: 0,
                top: 0,
                width: 1,
                height: 1,
            },
        });
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
    }

    #[test]
    fn compress_jpeg_keeps_format_and_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = write(tmp.path(), "src", &jpeg_bytes(80, 60));
        let output = tmp.path().join("out.jpeg");

        let backend = RustBackend::new();
        backend
            .compress(&CompressParams {
                source,
                output: output.clone(),
                quality: Quality::new(40),
            })
            .unwrap();

        let info = backend.identify(&output).unwrap();
        assert_eq!(info.kind, ImageKind::Jpeg);
        assert_eq!(
            info.dimensions,
            Some(Dimensions {
                width: 80,
                height: 60
            })
        );
    }

    #[test]
    fn compress_png_keeps_every_pixel() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = write(tmp.path(), "src", &png_bytes(40, 30));
        let output = tmp.path().join("out.png");

        RustBackend::new()
            .compress(&CompressParams {
                source: source.clone(),
                output: output.clone(),
                quality: Quality::new(10),
            })
            .unwrap();

        let before = image::load_from_memory(&std::fs::read(&source).unwrap()).unwrap().to_rgb8();
        let after = image::open(&output).unwrap().to_rgb8();
        assert_eq!(before, after);
    }

    #[test]
    fn compress_gif_keeps_animation() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = write(tmp.path(), "src", &gif_bytes(12, 8, 2));
        let output = tmp.path().join("out.gif");

        RustBackend::new()
            .compress(&CompressParams {
                source,
                output: output.clone(),
                quality: Quality::default(),
            })
            .unwrap();

        assert_eq!(gif_frame_count(&output), 2);
    }

    #[test]
    fn compress_unknown_format_copies_bytes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = write(tmp.path(), "src", b"<svg></svg>");
        let output = tmp.path().join("out.svg");

        RustBackend::new()
            .compress(&CompressParams {
                source,
                output: output.clone(),
                quality: Quality::default(),
            })
            .unwrap();

        assert_eq!(std::fs::read(output).unwrap(), b"<svg></svg>");
    }
}
