//! Shared test utilities for the crop-worker test suite.
//!
//! Synthetic images (so no fixture files are needed) and a ready-made
//! directory layout rooted in a [`TempDir`].

use crate::config::WorkerConfig;
use crate::formats::FormatCatalog;
use image::{DynamicImage, ImageEncoder, Rgb, RgbImage};
use std::path::Path;
use tempfile::TempDir;

/// A gradient image, so resizes have something to resample.
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Encode a gradient as JPEG bytes.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::write(path, jpeg_bytes(width, height)).unwrap();
}

/// Red/blue image split in half: top/bottom when `vertical`, else left/right.
pub fn two_tone(width: u32, height: u32, vertical: bool) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let first = if vertical {
            y < height / 2
        } else {
            x < width / 2
        };
        if first {
            Rgb([255, 0, 0])
        } else {
            Rgb([0, 0, 255])
        }
    });
    DynamicImage::ImageRgb8(img)
}

/// Config whose folders live inside `tmp`, with the given catalog JSON.
pub fn test_config(tmp: &TempDir, catalog_json: &str) -> WorkerConfig {
    WorkerConfig {
        images_folder: tmp.path().join("images"),
        original_folder: tmp.path().join("original"),
        image_formats: FormatCatalog::from_json(catalog_json).unwrap(),
        ..WorkerConfig::default()
    }
}
