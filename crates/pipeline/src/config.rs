use std::path::PathBuf;

/// Default number of jobs separated at once. Separation is GPU/CPU bound, so
/// one at a time is the safe default.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 1;

/// Default number of accepted jobs waiting for a worker.
pub const DEFAULT_JOB_QUEUE_CAPACITY: usize = 32;

/// Job orchestration settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root for staged uploads (`uploads/`) and engine output (`jobs/`).
    pub work_dir: PathBuf,
    pub max_concurrent_jobs: usize,
    pub job_queue_capacity: usize,
}

impl PipelineConfig {
    /// Load pipeline configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default                    |
    /// |-----------------------|----------------------------|
    /// | `WORK_DIR`            | `<system temp>/stemsplit`  |
    /// | `MAX_CONCURRENT_JOBS` | `1`                        |
    /// | `JOB_QUEUE_CAPACITY`  | `32`                       |
    pub fn from_env() -> Self {
        let work_dir = std::env::var("WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("stemsplit"));

        let max_concurrent_jobs: usize = std::env::var("MAX_CONCURRENT_JOBS")
            .unwrap_or_else(|_| DEFAULT_MAX_CONCURRENT_JOBS.to_string())
            .parse()
            .expect("MAX_CONCURRENT_JOBS must be a valid usize");
        assert!(max_concurrent_jobs > 0, "MAX_CONCURRENT_JOBS must be at least 1");

        let job_queue_capacity: usize = std::env::var("JOB_QUEUE_CAPACITY")
            .unwrap_or_else(|_| DEFAULT_JOB_QUEUE_CAPACITY.to_string())
            .parse()
            .expect("JOB_QUEUE_CAPACITY must be a valid usize");
        assert!(job_queue_capacity > 0, "JOB_QUEUE_CAPACITY must be at least 1");

        Self {
            work_dir,
            max_concurrent_jobs,
            job_queue_capacity,
        }
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.work_dir.join("uploads")
    }

    pub fn jobs_dir(&self) -> PathBuf {
        self.work_dir.join("jobs")
    }
}
