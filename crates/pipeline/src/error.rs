use stemsplit_core::error::CoreError;
use stemsplit_core::job::TransitionError;
use stemsplit_core::layout::MissingStems;
use stemsplit_core::types::JobId;
use stemsplit_engine::EngineError;
use stemsplit_storage::PublishError;

/// Job record store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("job {0} already exists")]
    AlreadyExists(JobId),

    #[error("job {0} not found")]
    NotFound(JobId),

    #[error("job {id}: {source}")]
    Transition {
        id: JobId,
        #[source]
        source: TransitionError,
    },
}

/// Why a job ended up `Failed`. The `Display` text becomes the record's error.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    MissingStems(#[from] MissingStems),

    #[error("failed to publish stems: {0}")]
    Publish(#[from] PublishError),

    #[error("job workspace error: {0}")]
    Workspace(#[source] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Abandoned(String),
}

/// Admission control errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("job queue is full ({capacity} jobs waiting); try again later")]
    QueueFull { capacity: usize },

    #[error("worker pool is shut down")]
    Closed,
}

/// Errors returned synchronously to a submitter. No job record exists when
/// one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("uploaded file is empty")]
    EmptyUpload,

    #[error("failed to stage upload: {0}")]
    Staging(#[source] std::io::Error),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CoreError::NotFound {
                entity: "Job",
                id: id.to_string(),
            },
            other => CoreError::Internal(other.to_string()),
        }
    }
}

impl From<SubmitError> for CoreError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::EmptyUpload => CoreError::Validation(err.to_string()),
            SubmitError::Pool(e) => CoreError::Unavailable(e.to_string()),
            SubmitError::Staging(_) => CoreError::Internal(err.to_string()),
            SubmitError::Store(e) => e.into(),
        }
    }
}
