//! Deriving the catalog's variants from a canonical original.
//!
//! For each format listed under the job's crop type, the variant at
//! `<images_folder>/<format>/<name>-<crop_type>.jpg` is regenerated when
//! forced, and otherwise only if it does not exist yet.
//!
//! ## Parallel Processing
//!
//! Formats are independent: each reads the same original and writes its own
//! file. Once the sync step has finished with the original they are cropped
//! in parallel on the rayon pool. Every write lands via an atomic rename, so
//! a format listed twice is simply written twice. The first failure fails the
//! job; formats already written stay written.

use crate::formats::{FormatCatalog, FormatSpec};
use crate::imaging::{BackendError, ImageBackend, Quality, create_variant, get_dimensions};
use crate::job::ImageJob;
use crate::layout::StorageLayout;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum VariantError {
    #[error("Crop type `{0}` is not in the format catalog")]
    UnknownCropType(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot read original {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("Failed to derive {format}: {source}")]
    Imaging {
        format: FormatSpec,
        #[source]
        source: BackendError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantStatus {
    /// Cropped and written during this run.
    Written,
    /// Already on disk and not forced; left alone.
    Cached,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantResult {
    pub format: FormatSpec,
    pub path: PathBuf,
    pub status: VariantStatus,
}

pub struct VariantGenerator<'a, B: ImageBackend> {
    backend: &'a B,
    layout: &'a StorageLayout,
    catalog: &'a FormatCatalog,
    quality: Quality,
}

impl<'a, B: ImageBackend> VariantGenerator<'a, B> {
    pub fn new(
        backend: &'a B,
        layout: &'a StorageLayout,
        catalog: &'a FormatCatalog,
        quality: Quality,
    ) -> Self {
        Self {
            backend,
            layout,
            catalog,
            quality,
        }
    }

    /// Produce every variant of `job`'s crop type.
    ///
    /// With `force`, existing variants are overwritten; without it they are
    /// kept. Results come back in catalog order.
    pub fn generate_all(
        &self,
        job: &ImageJob,
        force: bool,
    ) -> Result<Vec<VariantResult>, VariantError> {
        let formats = self
            .catalog
            .formats(&job.crop_type)
            .ok_or_else(|| VariantError::UnknownCropType(job.crop_type.clone()))?;

        let planned: Vec<(FormatSpec, PathBuf, bool)> = formats
            .iter()
            .map(|format| {
                let path = self.layout.variant_path(job, format);
                let regenerate = force || !path.exists();
                (*format, path, regenerate)
            })
            .collect();

        let source = self.layout.source_path(job);
        if planned.iter().any(|(_, _, regenerate)| *regenerate) {
            let (w, h) = get_dimensions(self.backend, &source).map_err(|e| {
                VariantError::Source {
                    path: source.clone(),
                    source: e,
                }
            })?;
            debug!(name = %job.name, width = w, height = h, "cropping original");
        }

        planned
            .into_par_iter()
            .map(|(format, path, regenerate)| {
                if !regenerate {
                    debug!(name = %job.name, %format, "variant exists, not regenerated");
                    return Ok(VariantResult {
                        format,
                        path,
                        status: VariantStatus::Cached,
                    });
                }

                // Concurrent creation of the same folder is fine.
                fs::create_dir_all(self.layout.format_dir(&format))?;
                create_variant(
                    self.backend,
                    &source,
                    &path,
                    &format,
                    job.crop,
                    self.quality,
                )
                .map_err(|e| VariantError::Imaging { format, source: e })?;
                info!(name = %job.name, %format, path = %path.display(), "variant written");

                Ok(VariantResult {
                    format,
                    path,
                    status: VariantStatus::Written,
                })
            })
            .collect()
    }
}
