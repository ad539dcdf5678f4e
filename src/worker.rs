//! One image job, end to end.
//!
//! [`Worker::run`] decodes a job payload, makes sure the canonical original is
//! current, then derives the variants. The worker owns nothing mutable: the
//! config, origin, and backend are fixed at construction, so one worker can
//! serve any number of jobs.

use crate::config::WorkerConfig;
use crate::imaging::{ImageBackend, Quality};
use crate::job::{self, ImageJob, JobError};
use crate::layout::StorageLayout;
use crate::origin::Origin;
use crate::sync::{Outcome, SyncError, SyncPlanner};
use crate::variants::{VariantError, VariantGenerator, VariantResult};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, info_span};

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Invalid job: {0}")]
    Job(#[from] JobError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Variant(#[from] VariantError),
}

/// What one job did.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job: ImageJob,
    pub outcome: Outcome,
    /// Empty when the job was skipped.
    pub variants: Vec<VariantResult>,
}

pub struct Worker<O: Origin, B: ImageBackend> {
    config: WorkerConfig,
    layout: StorageLayout,
    origin: O,
    backend: B,
}

impl<O: Origin, B: ImageBackend> Worker<O, B> {
    pub fn new(config: WorkerConfig, origin: O, backend: B) -> Self {
        let layout = config.layout();
        Self {
            config,
            layout,
            origin,
            backend,
        }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Handle one JSON job line.
    pub fn run_message(&self, message: &str) -> Result<JobReport, WorkerError> {
        let job = job::decode_str(message)?;
        self.process(job)
    }

    /// Handle one decoded JSON payload.
    ///
    /// A job whose original could not be obtained under the `recover` policy
    /// is still `Ok`; its report says [`Outcome::Skipped`].
    pub fn run(&self, payload: &Value) -> Result<JobReport, WorkerError> {
        let job = job::decode(payload)?;
        self.process(job)
    }

    pub fn process(&self, job: ImageJob) -> Result<JobReport, WorkerError> {
        let span = info_span!("job", name = %job.name, crop_type = %job.crop_type);
        let _enter = span.enter();

        let planner = SyncPlanner::new(&self.origin, &self.layout, self.config.errors);
        let outcome = planner.ensure_fresh(&job)?;

        if !outcome.has_original() {
            info!("no original available, nothing to crop");
            return Ok(JobReport {
                job,
                outcome,
                variants: Vec::new(),
            });
        }

        let generator = VariantGenerator::new(
            &self.backend,
            &self.layout,
            &self.config.image_formats,
            Quality::new(self.config.images.quality),
        );
        let force = job.force_crop || outcome.forces_regeneration();
        let variants = generator.generate_all(&job, force)?;

        Ok(JobReport {
            job,
            outcome,
            variants,
        })
    }
}
