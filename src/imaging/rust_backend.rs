//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::ImageReader` with format sniffing |
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Crop | `DynamicImage::crop_imm` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//!
//! Variants are always JPEG whatever the original's format. Output is written
//! to a temp file beside the destination and renamed into place, so readers
//! never see a half-written variant and two writers of the same variant
//! cannot interleave.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::plan_crop;
use super::params::CropParams;
use crate::job::Anchor;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Pure Rust backend using the `image` crate.
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

/// Load and decode an image from disk.
///
/// The format is sniffed from the content: originals keep whatever extension
/// their URL had, which is not always truthful.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Scale `img` to cover `width`x`height` and crop it to exactly that size.
///
/// See [`plan_crop`] for the geometry.
pub fn crop_and_resize(
    img: &DynamicImage,
    width: u32,
    height: u32,
    anchor: Anchor,
) -> Result<DynamicImage, BackendError> {
    let plan = plan_crop((img.width(), img.height()), (width, height), anchor).ok_or_else(|| {
        BackendError::ProcessingFailed(format!(
            "Cannot crop {}x{} to {width}x{height}",
            img.width(),
            img.height()
        ))
    })?;
    let scaled = img.resize_exact(plan.scaled.0, plan.scaled.1, FilterType::Lanczos3);
    if plan.scaled == (width, height) {
        return Ok(scaled);
    }
    let w = plan.window;
    Ok(scaled.crop_imm(w.x, w.y, w.width, w.height))
}

/// Encode as JPEG and atomically place at `path`.
fn save_jpeg(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        let encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100) as u8);
        // JPEG has no alpha channel
        DynamicImage::ImageRgb8(img.to_rgb8())
            .write_with_encoder(encoder)
            .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| BackendError::Io(e.error))?;
    Ok(())
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::open(path)?
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| {
                BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
            })?;
        Ok(Dimensions { width, height })
    }

    fn crop(&self, params: &CropParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let cropped = crop_and_resize(&img, params.width, params.height, params.anchor)?;
        save_jpeg(&cropped, &params.output, params.quality.value())
    }
}
