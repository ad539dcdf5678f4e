//! Image processing in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Scale + crop → JPEG** | Lanczos3 resize, anchored crop, `JpegEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure crop geometry (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining parameters + backend

pub mod backend;
pub mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{CropPlan, CropWindow, plan_crop};
pub use operations::{create_variant, get_dimensions};
pub use params::{CropParams, Quality};
pub use rust_backend::{RustBackend, crop_and_resize};
