//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the variant generator (which decides what to create)
//! and the [`backend`](super::backend) (which does the pixel work), so a mock
//! backend can stand in during tests.

use crate::job::Anchor;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// One variant to derive: read `source`, scale-and-crop to exactly
/// `width`x`height` around `anchor`, write a JPEG to `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct CropParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub anchor: Anchor,
    pub quality: Quality,
}
