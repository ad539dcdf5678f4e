//! On-disk naming of canonical originals and derived variants.
//!
//! ```text
//! <original_folder>/
//! │   └── a-hero.jpg               # canonical original (unified naming)
//! <images_folder>/
//! ├── 300_200/
//! │   └── a-hero.jpg               # variant, always JPEG
//! └── 1200_400/
//!     └── a-hero.jpg
//! ```
//!
//! ## Naming schemes
//!
//! The canonical original can be addressed two ways:
//!
//! - [`NamingScheme::Unified`] (default): `<name>-<crop_type>.<ext>` is used
//!   for the existence check, the digest comparison, the fetch destination and
//!   the crop source alike.
//! - [`NamingScheme::Legacy`]: freshness is checked against `<name>.<ext>`
//!   while downloads land in, and crops read from, `<name>-<crop_type>.<ext>`.
//!   Deployments that already populate `<name>.<ext>` out of band rely on
//!   this. Without that, every job re-downloads its original.

use crate::formats::FormatSpec;
use crate::job::ImageJob;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingScheme {
    #[default]
    Unified,
    Legacy,
}

/// Resolves every path the pipeline reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub original_folder: PathBuf,
    pub images_folder: PathBuf,
    pub naming: NamingScheme,
}

impl StorageLayout {
    pub fn new(
        original_folder: impl Into<PathBuf>,
        images_folder: impl Into<PathBuf>,
        naming: NamingScheme,
    ) -> Self {
        Self {
            original_folder: original_folder.into(),
            images_folder: images_folder.into(),
            naming,
        }
    }

    /// Path whose existence and digest decide whether to fetch.
    pub fn check_path(&self, job: &ImageJob) -> PathBuf {
        match self.naming {
            NamingScheme::Unified => self.fetch_path(job),
            NamingScheme::Legacy => self
                .original_folder
                .join(format!("{}.{}", job.name, job.extension)),
        }
    }

    /// Where a downloaded original is written.
    pub fn fetch_path(&self, job: &ImageJob) -> PathBuf {
        self.original_folder
            .join(format!("{}-{}.{}", job.name, job.crop_type, job.extension))
    }

    /// The original that variants are cropped from.
    pub fn source_path(&self, job: &ImageJob) -> PathBuf {
        self.fetch_path(job)
    }

    pub fn format_dir(&self, format: &FormatSpec) -> PathBuf {
        self.images_folder.join(format.to_string())
    }

    pub fn variant_path(&self, job: &ImageJob, format: &FormatSpec) -> PathBuf {
        self.format_dir(format)
            .join(format!("{}-{}.jpg", job.name, job.crop_type))
    }

    /// Display a path relative to the images folder when possible.
    pub fn relative_variant<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.images_folder).unwrap_or(path)
    }
}
