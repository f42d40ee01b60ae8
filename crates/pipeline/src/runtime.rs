use std::sync::Arc;

use stemsplit_core::audio::AudioFormat;
use stemsplit_engine::SeparationEngine;
use stemsplit_storage::ArtifactPublisher;

use crate::config::PipelineConfig;
use crate::pool::{Dispatcher, WorkerPool};
use crate::store::JobStore;
use crate::submission::SubmissionService;
use crate::worker::SeparationWorker;

/// The assembled job pipeline, shared by the HTTP layer.
#[derive(Clone)]
pub struct Pipeline {
    pub store: Arc<JobStore>,
    pub pool: WorkerPool,
    pub submission: Arc<SubmissionService>,
}

impl Pipeline {
    /// Wire store, worker, pool and submission together and create the
    /// working directories. The returned [`Dispatcher`] must be spawned for
    /// jobs to run.
    pub async fn build(
        config: &PipelineConfig,
        engine: Arc<dyn SeparationEngine>,
        publisher: Arc<dyn ArtifactPublisher>,
        output_format: AudioFormat,
    ) -> std::io::Result<(Self, Dispatcher)> {
        tokio::fs::create_dir_all(config.uploads_dir()).await?;
        tokio::fs::create_dir_all(config.jobs_dir()).await?;

        let store = Arc::new(JobStore::new());
        let worker = Arc::new(SeparationWorker::new(
            Arc::clone(&store),
            engine,
            publisher,
            config.jobs_dir(),
            output_format,
        ));
        let (pool, dispatcher) = WorkerPool::new(
            worker,
            config.max_concurrent_jobs,
            config.job_queue_capacity,
        );
        let submission = Arc::new(SubmissionService::new(
            Arc::clone(&store),
            pool.clone(),
            config.uploads_dir(),
        ));

        tracing::info!(
            work_dir = %config.work_dir.display(),
            max_concurrent_jobs = pool.max_concurrent(),
            job_queue_capacity = pool.queue_capacity(),
            "Job pipeline ready",
        );

        Ok((
            Self {
                store,
                pool,
                submission,
            },
            dispatcher,
        ))
    }
}
