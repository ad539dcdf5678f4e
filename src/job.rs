//! Job payload decoding.
//!
//! A job arrives as a JSON object:
//!
//! ```json
//! {"url": "http://cdn.example/a.jpg", "name": "a", "crop_type": "hero",
//!  "crop": "middle", "force_crop": false}
//! ```
//!
//! [`decode`] turns it into an [`ImageJob`]. All five keys are required. The
//! file extension is not read from the payload: it is whatever follows the last
//! `.` in `url`. The crop anchor is validated here, once, so nothing
//! downstream ever handles an unknown anchor.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Keys every payload must carry, in the order they are checked.
pub const REQUIRED_FIELDS: [&str; 5] = ["url", "name", "crop_type", "crop", "force_crop"];

#[derive(Error, Debug)]
pub enum JobError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Job payload is not a JSON object")]
    NotAnObject,
    #[error("Job payload is missing the `{0}` key")]
    MissingField(&'static str),
    #[error("Job field `{0}` must not be empty")]
    EmptyField(&'static str),
    #[error("Job field `{field}` has an unsupported value: {value}")]
    InvalidField { field: &'static str, value: String },
    #[error("Cannot derive an extension from URL {0}: no `.` found")]
    MissingExtension(String),
    #[error("{0} is not a valid crop anchor (expected top, middle or bottom)")]
    InvalidCropAnchor(String),
}

/// Which part of the scaled image survives the crop.
///
/// On the horizontal axis `Top` keeps the left edge and `Bottom` the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Top,
    Middle,
    Bottom,
}

impl FromStr for Anchor {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" => Ok(Anchor::Top),
            "middle" => Ok(Anchor::Middle),
            "bottom" => Ok(Anchor::Bottom),
            other => Err(JobError::InvalidCropAnchor(other.to_string())),
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Anchor::Top => "top",
            Anchor::Middle => "middle",
            Anchor::Bottom => "bottom",
        })
    }
}

/// A decoded, validated image job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageJob {
    /// Remote origin of the source image.
    pub url: String,
    /// Stable identifier, used as the filename stem.
    pub name: String,
    /// Substring of `url` after its last `.`.
    pub extension: String,
    /// Key into the format catalog.
    pub crop_type: String,
    pub crop: Anchor,
    /// Regenerate every variant even if it already exists.
    pub force_crop: bool,
}

/// Parse JSON text and decode it.
pub fn decode_str(payload: &str) -> Result<ImageJob, JobError> {
    let value: Value = serde_json::from_str(payload)?;
    decode(&value)
}

/// Decode a job payload.
pub fn decode(payload: &Value) -> Result<ImageJob, JobError> {
    let map = payload.as_object().ok_or(JobError::NotAnObject)?;
    if let Some(missing) = REQUIRED_FIELDS.into_iter().find(|key| !map.contains_key(*key)) {
        return Err(JobError::MissingField(missing));
    }

    let url = string_field(payload, "url")?;
    let name = path_component("name", string_field(payload, "name")?)?;
    let crop_type = path_component("crop_type", string_field(payload, "crop_type")?)?;
    let crop: Anchor = string_field(payload, "crop")?.parse()?;
    let force_crop = bool_field(payload, "force_crop")?;

    let extension = match url.rsplit_once('.') {
        Some((_, ext)) => ext.to_string(),
        None => return Err(JobError::MissingExtension(url)),
    };
    if extension.is_empty() {
        return Err(JobError::EmptyField("extension"));
    }
    let extension = path_component("extension", extension)?;

    Ok(ImageJob {
        url,
        name,
        extension,
        crop_type,
        crop,
        force_crop,
    })
}

/// Strings are taken as-is; numbers are accepted and stringified.
fn string_field(payload: &Value, field: &'static str) -> Result<String, JobError> {
    let s = match &payload[field] {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(JobError::InvalidField {
                field,
                value: other.to_string(),
            });
        }
    };
    if s.is_empty() {
        return Err(JobError::EmptyField(field));
    }
    Ok(s)
}

/// `name`, `crop_type` and the extension become file and folder names, so
/// each must stay a single component inside the configured folders.
fn path_component(field: &'static str, value: String) -> Result<String, JobError> {
    if value.contains(['/', '\\', '\0']) || value == ".." {
        return Err(JobError::InvalidField { field, value });
    }
    Ok(value)
}

/// Booleans as-is; numbers are true when non-zero.
fn bool_field(payload: &Value, field: &'static str) -> Result<bool, JobError> {
    match &payload[field] {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        other => Err(JobError::InvalidField {
            field,
            value: other.to_string(),
        }),
    }
}
