//! Worker configuration.
//!
//! Loaded once at startup from a TOML file and passed by reference from then
//! on; nothing in the pipeline reads process-wide state.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! images_folder = "images"      # Root of the per-format variant folders
//! original_folder = "original"  # Canonical originals
//! naming = "unified"            # or "legacy", see crate::layout
//!
//! [image_formats]               # crop_type -> ["<width>_<height>", ...]
//! hero = ["1200_400", "300_200"]
//!
//! [images]
//! quality = 90                  # JPEG quality (1-100)
//!
//! [errors]
//! fetch_failed = "recover"         # download failed: skip the job
//! unreachable_source = "propagate" # comparison stream failed: fail the job
//!
//! [http]
//! timeout_secs = 30
//! user_agent = "crop-worker/<version>"
//!
//! [processing]
//! max_processes = 4             # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! User files are sparse: stock defaults are serialized to a TOML table and
//! the user's table is merged on top before deserializing. Unknown keys are
//! rejected to catch typos early.

use crate::formats::FormatCatalog;
use crate::layout::{NamingScheme, StorageLayout};
use crate::sync::ErrorPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Worker configuration loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    /// Root folder for derived variants; one subfolder per format.
    pub images_folder: PathBuf,
    /// Folder holding canonical originals.
    pub original_folder: PathBuf,
    /// How canonical originals are named on disk.
    pub naming: NamingScheme,
    /// Formats to derive, per crop type.
    pub image_formats: FormatCatalog,
    /// Variant encoding settings.
    pub images: ImagesConfig,
    /// Which sync failures are recovered and which fail the job.
    pub errors: ErrorPolicy,
    /// Origin client settings.
    pub http: HttpConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            images_folder: PathBuf::from("images"),
            original_folder: PathBuf::from("original"),
            naming: NamingScheme::default(),
            image_formats: FormatCatalog::default(),
            images: ImagesConfig::default(),
            errors: ErrorPolicy::default(),
            http: HttpConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.quality == 0 || self.images.quality > 100 {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "http.timeout_secs must be non-zero".into(),
            ));
        }
        if self.images_folder.as_os_str().is_empty() || self.original_folder.as_os_str().is_empty()
        {
            return Err(ConfigError::Validation(
                "images_folder and original_folder must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn layout(&self) -> StorageLayout {
        StorageLayout::new(&self.original_folder, &self.images_folder, self.naming)
    }
}

/// Variant encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self { quality: 90 }
    }
}

/// Origin client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Whole-request timeout, covering both fetches and digest comparisons.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("crop-worker/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel variant workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// The stock default config as a `toml::Value::Table`, the base layer that
/// user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(WorkerConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<WorkerConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: WorkerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file.
///
/// A missing file yields the stock defaults; a file that exists but does not
/// parse or validate is an error.
pub fn load_config(path: &Path) -> Result<WorkerConfig, ConfigError> {
    let overlay = if path.exists() {
        let content = fs::read_to_string(path)?;
        Some(toml::from_str::<toml::Value>(&content)?)
    } else {
        None
    };
    resolve_config(overlay)
}

/// A fully-commented stock config, printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# crop-worker configuration
# ========================
# All settings are optional. Values shown below are the defaults,
# except [image_formats], which is empty by default.
# Unknown keys will cause an error.

# Root folder for derived variants. Each format gets its own subfolder:
#   <images_folder>/<width>_<height>/<name>-<crop_type>.jpg
images_folder = "images"

# Folder holding the cached originals downloaded from each job's URL.
original_folder = "original"

# How cached originals are named.
#   "unified": <name>-<crop_type>.<ext> for both the freshness check and
#              the download destination.
#   "legacy":  check <name>.<ext>, download to <name>-<crop_type>.<ext>.
naming = "unified"

# ---------------------------------------------------------------------------
# Format catalog
# ---------------------------------------------------------------------------
# One entry per crop type; each lists "<width>_<height>" target sizes.
# Jobs name their crop type; an unknown crop type fails the job.
[image_formats]
# hero = ["1200_400", "300_200"]
# thumbnail = ["150_150"]

# ---------------------------------------------------------------------------
# Variant encoding
# ---------------------------------------------------------------------------
[images]
# JPEG quality (1 = worst, 100 = best).
quality = 90

# ---------------------------------------------------------------------------
# Error policy: "recover" or "propagate"
# ---------------------------------------------------------------------------
[errors]
# Downloading the original failed. "recover" acknowledges the job as a no-op.
fetch_failed = "recover"
# The origin could not be opened to compare against the cached copy.
# "recover" keeps the cached copy and carries on.
unreachable_source = "propagate"

# ---------------------------------------------------------------------------
# Origin client
# ---------------------------------------------------------------------------
[http]
timeout_secs = 30
# user_agent = "crop-worker/<version>"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel variant workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::FormatSpec;
    use crate::sync::PolicyAction;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = WorkerConfig::default();
        assert_eq!(config.images_folder, PathBuf::from("images"));
        assert_eq!(config.original_folder, PathBuf::from("original"));
        assert_eq!(config.naming, NamingScheme::Unified);
        assert!(config.image_formats.is_empty());
        assert_eq!(config.images.quality, 90);
        assert_eq!(config.errors.fetch_failed, PolicyAction::Recover);
        assert_eq!(config.errors.unreachable_source, PolicyAction::Propagate);
        assert_eq!(config.http.timeout_secs, 30);
        assert!(config.http.user_agent.starts_with("crop-worker/"));
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
images_folder = "/srv/images"

[image_formats]
hero = ["300_200", "1200_400"]
"#;
        let config = resolve_config(Some(toml::from_str(toml).unwrap())).unwrap();
        assert_eq!(config.images_folder, PathBuf::from("/srv/images"));
        assert_eq!(config.original_folder, PathBuf::from("original"));
        assert_eq!(
            config.image_formats.formats("hero").unwrap(),
            &[FormatSpec::new(300, 200), FormatSpec::new(1200, 400)]
        );
    }

    #[test]
    fn parse_error_policy() {
        let toml = r#"
[errors]
fetch_failed = "propagate"
unreachable_source = "recover"
"#;
        let config = resolve_config(Some(toml::from_str(toml).unwrap())).unwrap();
        assert_eq!(config.errors.fetch_failed, PolicyAction::Propagate);
        assert_eq!(config.errors.unreachable_source, PolicyAction::Recover);
    }

    #[test]
    fn bad_format_spec_rejected() {
        let toml = r#"
[image_formats]
hero = ["300x200"]
"#;
        assert!(resolve_config(Some(toml::from_str(toml).unwrap())).is_err());
    }

    #[test]
    fn layout_follows_config() {
        let toml = r#"
images_folder = "/i"
original_folder = "/o"
naming = "legacy"
"#;
        let config = resolve_config(Some(toml::from_str(toml).unwrap())).unwrap();
        let layout = config.layout();
        assert_eq!(layout.images_folder, PathBuf::from("/i"));
        assert_eq!(layout.original_folder, PathBuf::from("/o"));
        assert_eq!(layout.naming, NamingScheme::Legacy);
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("worker.toml")).unwrap();
        assert_eq!(config.images.quality, 90);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("worker.toml");
        fs::write(
            &path,
            r#"
[images]
quality = 75

[image_formats]
thumbnail = ["150_150"]
"#,
        )
        .unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.images.quality, 75);
        assert_eq!(
            config.image_formats.formats("thumbnail").unwrap(),
            &[FormatSpec::new(150, 150)]
        );
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("worker.toml");
        fs::write(&path, "images_folder = [unclosed").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let toml = r#"
[images]
qualty = 90
"#;
        assert!(resolve_config(Some(toml::from_str(toml).unwrap())).is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let toml = r#"
[thumbnails]
aspect_ratio = [4, 5]
"#;
        assert!(resolve_config(Some(toml::from_str(toml).unwrap())).is_err());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_quality_bounds() {
        let mut config = WorkerConfig::default();
        config.images.quality = 100;
        assert!(config.validate().is_ok());
        config.images.quality = 101;
        assert!(config.validate().is_err());
        config.images.quality = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_zero_timeout() {
        let mut config = WorkerConfig::default();
        config.http.timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn validate_zero_processes() {
        let mut config = WorkerConfig::default();
        config.processing.max_processes = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(WorkerConfig::default().validate().is_ok());
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\nz = 4").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"]["x"].as_integer(), Some(1));
        assert_eq!(merged["a"]["y"].as_integer(), Some(3));
        assert_eq!(merged["a"]["z"].as_integer(), Some(4));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str("f = [\"1_1\", \"2_2\"]").unwrap();
        let overlay: toml::Value = toml::from_str("f = [\"3_3\"]").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["f"].as_array().unwrap().len(), 1);
    }

    // =========================================================================
    // Threads and stock config
    // =========================================================================

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_auto_is_positive() {
        assert!(effective_threads(&ProcessingConfig::default()) >= 1);
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let value: toml::Value = toml::from_str(stock_config_toml()).unwrap();
        let config = resolve_config(Some(value)).unwrap();
        let default = WorkerConfig::default();
        assert_eq!(config.images_folder, default.images_folder);
        assert_eq!(config.naming, default.naming);
        assert_eq!(config.images.quality, default.images.quality);
        assert_eq!(config.errors, default.errors);
        assert_eq!(config.http.timeout_secs, default.http.timeout_secs);
        assert!(config.image_formats.is_empty());
    }
}
