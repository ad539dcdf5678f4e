//! # Crop Worker
//!
//! Turns image jobs into a fixed catalog of cropped JPEG variants. A job
//! names a remote source image, a crop type, and an anchor; the worker keeps
//! a canonical local copy of the source in step with its origin and derives
//! one variant per format listed for that crop type.
//!
//! # Pipeline
//!
//! ```text
//! 1. Decode   JSON payload      →  ImageJob           (validated, typed)
//! 2. Sync     ImageJob + origin →  original/<name>-<crop_type>.<ext>  + Outcome
//! 3. Derive   original + catalog → images/<W>_<H>/<name>-<crop_type>.jpg
//! ```
//!
//! Step 2 compares SHA-256 digests of the local copy and the remote body, so
//! an unchanged origin is never re-downloaded. When it *has* changed, the
//! [`sync::Outcome`] says so and step 3 rewrites every variant instead of
//! only the missing ones.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`job`] | Job payload decoding and validation, the [`job::Anchor`] enum |
//! | [`digest`] | Streaming SHA-256 of files and byte streams |
//! | [`origin`] | [`origin::Origin`] trait, blocking HTTP client, atomic download |
//! | [`sync`] | Freshness decision for the canonical original, error policy |
//! | [`imaging`] | Crop geometry, the image backend trait, pure-Rust backend |
//! | [`variants`] | Per-format variant generation with regeneration gating |
//! | [`worker`] | Decode → sync → derive for one job |
//! | [`formats`] | The `W_H` format catalog keyed by crop type |
//! | [`layout`] | Every path the pipeline touches, naming schemes |
//! | [`config`] | `worker.toml` loading, merging, and validation |
//! | [`output`] | CLI display of job reports |
//!
//! # Design Decisions
//!
//! ## JPEG Only
//!
//! Variants are always JPEG regardless of the source format. Consumers serve
//! them by a path they can compute from the job alone, which only works if
//! the extension is fixed.
//!
//! ## Atomic Writes
//!
//! Downloads and variants are written to a temp file next to their
//! destination and renamed into place. Readers never see a half-written
//! original or variant, and formats can be derived in parallel without
//! coordinating.
//!
//! ## Explicit Error Policy
//!
//! A failed download and an unreachable origin are treated differently in
//! practice: the first usually means the image is gone and the job can be
//! dropped, the second means something is wrong upstream. Which one fails
//! the job is a config table ([`sync::ErrorPolicy`]), not a code path.

pub mod config;
pub mod digest;
pub mod formats;
pub mod imaging;
pub mod job;
pub mod layout;
pub mod origin;
pub mod output;
pub mod sync;
pub mod variants;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_helpers;
