//! Keeping the canonical original in step with its origin.
//!
//! [`SyncPlanner::ensure_fresh`] decides, per job, whether the cached
//! original has to be downloaded:
//!
//! ```text
//! check path missing ──► fetch ──► ok ─────────────► Fetched
//!                                 └ fails ─[policy]─► Skipped | error
//! check path present ──► digest(local) vs digest(remote)
//!                        ├ remote unreachable ─[policy]─► Stale | error
//!                        ├ equal ───────────────────────► UpToDate
//!                        └ differ ──► fetch ──► ok ─────► Fetched
//!                                          └ fails ─[policy]─► Stale | error
//! ```
//!
//! The returned [`Outcome`] tells the variant generator whether every
//! variant must be regenerated (`Fetched`) or only the missing ones.
//!
//! ## Error policy
//!
//! The two recoverable failure kinds are routed through an explicit
//! [`ErrorPolicy`] table instead of being hardcoded. The default mirrors
//! what deployments expect: a download that fails is acknowledged as a
//! no-op, while an origin that cannot even be opened for comparison fails the
//! job loudly.

use crate::digest::{self, Digest};
use crate::job::ImageJob;
use crate::layout::StorageLayout;
use crate::origin::{self, Origin, OriginError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{url} cannot be retrieved: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: OriginError,
    },
    #[error("{url} is unreachable: {source}")]
    UnreachableSource {
        url: String,
        #[source]
        source: OriginError,
    },
    #[error("IO error reading cached original: {0}")]
    Io(#[from] std::io::Error),
}

/// What happened to the canonical original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Downloaded (first time or because the origin changed).
    Fetched,
    /// Local copy matches the origin.
    UpToDate,
    /// Local copy kept although it could not be confirmed or refreshed.
    Stale,
    /// No original could be obtained; the job is a no-op.
    Skipped,
}

impl Outcome {
    /// Whether every variant must be rebuilt, existing or not.
    pub fn forces_regeneration(self) -> bool {
        self == Outcome::Fetched
    }

    /// Whether there is an original to derive variants from.
    pub fn has_original(self) -> bool {
        self != Outcome::Skipped
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Fetched => "fetched",
            Outcome::UpToDate => "up to date",
            Outcome::Stale => "stale",
            Outcome::Skipped => "skipped",
        })
    }
}

/// What to do with a failure of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    /// Log it and carry on with a degraded outcome.
    Recover,
    /// Fail the job.
    Propagate,
}

/// Failure kind → action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ErrorPolicy {
    /// Downloading the original failed.
    pub fetch_failed: PolicyAction,
    /// Opening or reading the origin for digest comparison failed.
    pub unreachable_source: PolicyAction,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self {
            fetch_failed: PolicyAction::Recover,
            unreachable_source: PolicyAction::Propagate,
        }
    }
}

pub struct SyncPlanner<'a, O: Origin + ?Sized> {
    origin: &'a O,
    layout: &'a StorageLayout,
    policy: ErrorPolicy,
}

impl<'a, O: Origin + ?Sized> SyncPlanner<'a, O> {
    pub fn new(origin: &'a O, layout: &'a StorageLayout, policy: ErrorPolicy) -> Self {
        Self {
            origin,
            layout,
            policy,
        }
    }

    /// Make sure the job's original is present and current.
    pub fn ensure_fresh(&self, job: &ImageJob) -> Result<Outcome, SyncError> {
        let check_path = self.layout.check_path(job);

        if !check_path.exists() {
            debug!(name = %job.name, "original not on disk, downloading");
            return match origin::fetch(self.origin, &job.url, &self.layout.fetch_path(job)) {
                Ok(_) => Ok(Outcome::Fetched),
                Err(e) => self.on_fetch_failed(job, e, Outcome::Skipped),
            };
        }

        debug!(name = %job.name, path = %check_path.display(), "original on disk, comparing digests");
        let local = digest::digest_file(&check_path)?;
        let remote = match self.remote_digest(&job.url) {
            Ok(d) => d,
            Err(e) => return self.on_unreachable(job, e),
        };

        if local == remote {
            debug!(name = %job.name, digest = %local, "original is up to date");
            return Ok(Outcome::UpToDate);
        }

        info!(name = %job.name, %local, %remote, "original changed at origin, downloading");
        match origin::fetch(self.origin, &job.url, &self.layout.fetch_path(job)) {
            Ok(_) => Ok(Outcome::Fetched),
            Err(e) => self.on_fetch_failed(job, e, Outcome::Stale),
        }
    }

    fn remote_digest(&self, url: &str) -> Result<Digest, OriginError> {
        let body = self.origin.open(url)?;
        Ok(digest::digest(body)?)
    }

    fn on_fetch_failed(
        &self,
        job: &ImageJob,
        err: OriginError,
        recovered: Outcome,
    ) -> Result<Outcome, SyncError> {
        match self.policy.fetch_failed {
            PolicyAction::Recover => {
                warn!(name = %job.name, url = %job.url, error = %err, outcome = %recovered, "original cannot be retrieved");
                Ok(recovered)
            }
            PolicyAction::Propagate => {
                error!(name = %job.name, url = %job.url, error = %err, "original cannot be retrieved");
                Err(SyncError::FetchFailed {
                    url: job.url.clone(),
                    source: err,
                })
            }
        }
    }

    fn on_unreachable(&self, job: &ImageJob, err: OriginError) -> Result<Outcome, SyncError> {
        match self.policy.unreachable_source {
            PolicyAction::Recover => {
                warn!(name = %job.name, url = %job.url, error = %err, "origin unreachable, keeping cached original");
                Ok(Outcome::Stale)
            }
            PolicyAction::Propagate => {
                error!(name = %job.name, url = %job.url, error = %err, "origin unreachable");
                Err(SyncError::UnreachableSource {
                    url: job.url.clone(),
                    source: err,
                })
            }
        }
    }
}
