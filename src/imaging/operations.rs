//! High-level image operations.
//!
//! These functions turn a job and a format into backend parameters and run
//! them. They decide nothing about caching; that is the variant generator's
//! job.

use super::backend::{BackendError, ImageBackend};
use super::params::{CropParams, Quality};
use crate::formats::FormatSpec;
use crate::job::Anchor;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Plan a variant without executing it.
pub fn plan_variant(
    source: &Path,
    output: &Path,
    format: &FormatSpec,
    anchor: Anchor,
    quality: Quality,
) -> CropParams {
    CropParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        width: format.width,
        height: format.height,
        anchor,
        quality,
    }
}

/// Derive one variant from `source` and write it to `output`.
pub fn create_variant(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    format: &FormatSpec,
    anchor: Anchor,
    quality: Quality,
) -> Result<()> {
    let params = plan_variant(source, output, format, anchor, quality);
    backend.crop(&params)
}
