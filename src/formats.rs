//! The format catalog: which variants to derive for each crop type.
//!
//! A format is written `"<width>_<height>"` (e.g. `"300_200"`). That same
//! string names the output directory, so [`FormatSpec`] parses and displays
//! it losslessly. The catalog maps a crop type to an ordered list of formats:
//!
//! ```json
//! {"hero": ["1200_400", "300_200"], "thumbnail": ["150_150"]}
//! ```
//!
//! Order is preserved and duplicates are kept; both are the caller's choice.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} is not a valid format (expected <width>_<height>)")]
    Invalid(String),
    #[error("{0} has a zero dimension")]
    ZeroDimension(String),
}

/// Target pixel size of one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FormatSpec {
    pub width: u32,
    pub height: u32,
}

impl FormatSpec {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl FromStr for FormatSpec {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once('_')
            .ok_or_else(|| FormatError::Invalid(s.to_string()))?;
        let width: u32 = w.parse().map_err(|_| FormatError::Invalid(s.to_string()))?;
        let height: u32 = h.parse().map_err(|_| FormatError::Invalid(s.to_string()))?;
        if width == 0 || height == 0 {
            return Err(FormatError::ZeroDimension(s.to_string()));
        }
        Ok(Self { width, height })
    }
}

impl TryFrom<String> for FormatSpec {
    type Error = FormatError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FormatSpec> for String {
    fn from(spec: FormatSpec) -> Self {
        spec.to_string()
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.width, self.height)
    }
}

/// Crop type → ordered formats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatCatalog(BTreeMap<String, Vec<FormatSpec>>);

impl FormatCatalog {
    pub fn from_json(json: &str) -> Result<Self, FormatError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_json(path: &Path) -> Result<Self, FormatError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Formats for a crop type, or `None` if the catalog doesn't know it.
    pub fn formats(&self, crop_type: &str) -> Option<&[FormatSpec]> {
        self.0.get(crop_type).map(Vec::as_slice)
    }

    pub fn crop_types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
