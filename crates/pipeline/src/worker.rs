//! Separation worker.
//!
//! Runs one job end to end: `Processing`, engine run, artifact discovery,
//! publishing, reconciliation, and finally `Completed` or `Failed`. The
//! job's input and output are released before the terminal state is
//! recorded, so a terminal record never has leftovers on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stemsplit_core::audio::AudioFormat;
use stemsplit_core::job::{StemReferences, PROGRESS_ENGINE_DONE, PROGRESS_ENGINE_RUNNING};
use stemsplit_core::layout::{reconcile, ExpectedArtifact, MissingStems, OutputLayout};
use stemsplit_core::request::SeparationRequest;
use stemsplit_core::types::JobId;
use stemsplit_engine::{EngineJob, SeparationEngine};
use stemsplit_storage::ArtifactPublisher;

use crate::error::JobError;
use crate::store::JobStore;
use crate::workspace::JobWorkspace;

/// A queued unit of work.
#[derive(Debug, Clone)]
pub struct JobTicket {
    pub id: JobId,
    pub request: SeparationRequest,
    pub input_path: PathBuf,
}

/// Final result of a job, as recorded in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(StemReferences),
    Failed(String),
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

pub struct SeparationWorker {
    store: Arc<JobStore>,
    engine: Arc<dyn SeparationEngine>,
    publisher: Arc<dyn ArtifactPublisher>,
    jobs_dir: PathBuf,
    output_format: AudioFormat,
}

impl SeparationWorker {
    /// `jobs_dir` is the parent of every per-job output directory.
    /// `output_format` must match what the engine is configured to write.
    pub fn new(
        store: Arc<JobStore>,
        engine: Arc<dyn SeparationEngine>,
        publisher: Arc<dyn ArtifactPublisher>,
        jobs_dir: PathBuf,
        output_format: AudioFormat,
    ) -> Self {
        Self {
            store,
            engine,
            publisher,
            jobs_dir,
            output_format,
        }
    }

    /// Run the job to a terminal state. Never panics on job failure; the
    /// failure is recorded and returned as [`JobOutcome::Failed`].
    pub async fn run(&self, ticket: JobTicket) -> JobOutcome {
        let job_id = ticket.id;
        let workspace = self.workspace_for(&ticket);

        tracing::info!(
            job_id = %job_id,
            model = %ticket.request.model,
            reduction_target = ?ticket.request.reduction_target,
            passes = ticket.request.passes,
            "Job started",
        );

        let result = self.execute(&ticket, &workspace).await;
        workspace.release().await;

        match result {
            Ok(stems) => match self.store.complete(job_id, stems.clone()).await {
                Ok(_) => {
                    tracing::info!(job_id = %job_id, "Job completed");
                    JobOutcome::Completed(stems)
                }
                Err(e) => {
                    tracing::error!(job_id = %job_id, error = %e, "Failed to record job completion");
                    JobOutcome::Failed(e.to_string())
                }
            },
            Err(e) => self.record_failure(job_id, e).await,
        }
    }

    /// Fail a job that will never run (e.g. queued at shutdown) and release
    /// its input.
    pub async fn abandon(&self, ticket: JobTicket, reason: &str) -> JobOutcome {
        let job_id = ticket.id;
        self.workspace_for(&ticket).release().await;

        if let Err(e) = self.store.start(job_id).await {
            tracing::error!(job_id = %job_id, error = %e, "Failed to mark abandoned job");
            return JobOutcome::Failed(reason.to_string());
        }
        self.record_failure(job_id, JobError::Abandoned(reason.to_string()))
            .await
    }

    fn workspace_for(&self, ticket: &JobTicket) -> JobWorkspace {
        JobWorkspace::new(
            ticket.id,
            ticket.input_path.clone(),
            self.jobs_dir.join(ticket.id.to_string()),
        )
    }

    async fn record_failure(&self, job_id: JobId, error: JobError) -> JobOutcome {
        let message = error.to_string();
        tracing::warn!(job_id = %job_id, error = %message, "Job failed");

        if let Err(e) = self.store.fail(job_id, message.clone()).await {
            tracing::error!(job_id = %job_id, error = %e, "Failed to record job failure");
        }
        JobOutcome::Failed(message)
    }

    async fn execute(
        &self,
        ticket: &JobTicket,
        workspace: &JobWorkspace,
    ) -> Result<StemReferences, JobError> {
        let job_id = ticket.id;
        self.store.start(job_id).await?;

        workspace.allocate().await.map_err(JobError::Workspace)?;

        self.store
            .set_progress(job_id, PROGRESS_ENGINE_RUNNING)
            .await?;

        let engine_job = EngineJob {
            input_path: workspace.input_path().to_path_buf(),
            output_dir: workspace.output_dir().to_path_buf(),
            model: ticket.request.model,
            reduction_target: ticket.request.reduction_target,
            passes: ticket.request.passes,
        };
        self.engine.separate(&engine_job).await?;

        self.store.set_progress(job_id, PROGRESS_ENGINE_DONE).await?;

        let layout = OutputLayout::for_request(&ticket.request);
        let track_dir = OutputLayout::track_dir(
            workspace.output_dir(),
            ticket.request.model,
            workspace.input_path(),
        );
        let artifacts = layout.expected_artifacts(&track_dir, self.output_format);

        // Nothing is uploaded unless every expected artifact is present.
        discover(&artifacts).await?;

        let mut published = Vec::with_capacity(artifacts.len());
        for artifact in &artifacts {
            let key = self.object_key(job_id, &artifact.path);
            let reference = self.publisher.publish(&artifact.path, &key).await?;
            tracing::debug!(job_id = %job_id, stem = %artifact.role, reference = %reference, "Stem published");
            published.push((artifact.role, reference));
        }

        Ok(reconcile(layout, &published)?)
    }

    /// Destination key: `<job id>/<file name>`.
    fn object_key(&self, job_id: JobId, path: &Path) -> String {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{job_id}/{file_name}")
    }
}

/// Check that every expected artifact exists, naming the ones that don't.
async fn discover(artifacts: &[ExpectedArtifact]) -> Result<(), MissingStems> {
    let mut missing = Vec::new();
    for artifact in artifacts {
        let is_file = tokio::fs::metadata(&artifact.path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            missing.push(artifact.role.file_stem());
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MissingStems(missing))
    }
}
