//! Pure crop geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! A variant is produced in two steps: scale the source so that it covers the
//! target on both axes while keeping its aspect ratio, then cut a
//! target-sized window out of the scaled image. Which window survives is
//! decided by the [`Anchor`].

use crate::job::Anchor;

/// A rectangle inside the scaled image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// How to get from a source size to a target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropPlan {
    /// Size to resize the source to, before cropping.
    pub scaled: (u32, u32),
    /// Region of the scaled image to keep.
    pub window: CropWindow,
}

/// Plan a scale-then-crop from `source` to exactly `target`.
///
/// Ratios are compared by cross-multiplication so equal ratios are detected
/// exactly, without floating point.
///
/// - Target relatively wider: width becomes `target.0`, height is scaled and
///   floored, then rows are cropped by anchor.
/// - Target relatively taller: height becomes `target.1`, width is scaled and
///   floored, then columns are cropped by anchor (`Top` = left edge,
///   `Bottom` = right edge).
/// - Same ratio: plain resize, the window is the whole image.
///
/// Returns `None` if any dimension is zero or the scaled side would not fit
/// in a `u32`.
///
/// # Examples
/// ```
/// # use crop_worker::imaging::calculations::{plan_crop, CropWindow};
/// # use crop_worker::job::Anchor;
/// // 400x400 into 300x200: scale to 300x300, keep the middle 200 rows
/// let plan = plan_crop((400, 400), (300, 200), Anchor::Middle).unwrap();
/// assert_eq!(plan.scaled, (300, 300));
/// assert_eq!(plan.window, CropWindow { x: 0, y: 50, width: 300, height: 200 });
/// ```
pub fn plan_crop(source: (u32, u32), target: (u32, u32), anchor: Anchor) -> Option<CropPlan> {
    let (src_w, src_h) = (source.0 as u64, source.1 as u64);
    let (tgt_w, tgt_h) = target;
    if src_w == 0 || src_h == 0 || tgt_w == 0 || tgt_h == 0 {
        return None;
    }

    let wide = tgt_w as u64 * src_h;
    let tall = tgt_h as u64 * src_w;

    if wide > tall {
        // Target is relatively wider: fit width, crop rows.
        // floor(tgt_w * src_h / src_w) > tgt_h - 1, so the window always fits.
        let scaled_h = u32::try_from(tgt_w as u64 * src_h / src_w).ok()?;
        let y = anchor_offset(scaled_h, tgt_h, anchor);
        Some(CropPlan {
            scaled: (tgt_w, scaled_h),
            window: CropWindow {
                x: 0,
                y,
                width: tgt_w,
                height: tgt_h,
            },
        })
    } else if wide < tall {
        // Target is relatively taller: fit height, crop columns.
        let scaled_w = u32::try_from(tgt_h as u64 * src_w / src_h).ok()?;
        let x = anchor_offset(scaled_w, tgt_w, anchor);
        Some(CropPlan {
            scaled: (scaled_w, tgt_h),
            window: CropWindow {
                x,
                y: 0,
                width: tgt_w,
                height: tgt_h,
            },
        })
    } else {
        Some(CropPlan {
            scaled: target,
            window: CropWindow {
                x: 0,
                y: 0,
                width: tgt_w,
                height: tgt_h,
            },
        })
    }
}

/// Start of a `window`-long span inside `extent`, per anchor.
fn anchor_offset(extent: u32, window: u32, anchor: Anchor) -> u32 {
    let slack = extent.saturating_sub(window);
    match anchor {
        Anchor::Top => 0,
        Anchor::Middle => slack / 2,
        Anchor::Bottom => slack,
    }
}
