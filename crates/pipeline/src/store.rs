//! In-memory job record store.
//!
//! The single source of truth for status queries. Every mutation goes
//! through [`JobStore::mutate`], which applies the change under the write
//! lock only if [`JobState::check_transition`] accepts it, so readers never
//! observe an illegal or half-applied state.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::RwLock;

use stemsplit_core::job::{JobState, StemReferences, PROGRESS_STARTED};
use stemsplit_core::request::SeparationRequest;
use stemsplit_core::types::{JobId, Timestamp};

use crate::error::StoreError;

/// One separation job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub id: JobId,
    pub state: JobState,
    pub request: SeparationRequest,
    /// Staged input file, owned by the job's worker.
    pub input_path: PathBuf,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new `Queued` record. Fails if `id` is already taken.
    pub async fn create(
        &self,
        id: JobId,
        request: SeparationRequest,
        input_path: PathBuf,
    ) -> Result<JobRecord, StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }

        let now = chrono::Utc::now();
        let record = JobRecord {
            id,
            state: JobState::Queued,
            request,
            input_path,
            created_at: now,
            updated_at: now,
        };
        jobs.insert(id, record.clone());
        Ok(record)
    }

    pub async fn get(&self, id: JobId) -> Result<JobRecord, StoreError> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    /// Atomically replace a job's state with `f(current)`.
    ///
    /// The new state is validated against the lifecycle before it is
    /// stored; a rejected transition leaves the record untouched.
    pub async fn mutate(
        &self,
        id: JobId,
        f: impl FnOnce(&JobState) -> JobState,
    ) -> Result<JobRecord, StoreError> {
        let mut jobs = self.jobs.write().await;
        let record = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        let next = f(&record.state);
        record
            .state
            .check_transition(&next)
            .map_err(|source| StoreError::Transition { id, source })?;

        record.state = next;
        record.updated_at = chrono::Utc::now();
        Ok(record.clone())
    }

    /// `Queued -> Processing` at the first checkpoint.
    pub async fn start(&self, id: JobId) -> Result<JobRecord, StoreError> {
        self.mutate(id, |_| JobState::Processing {
            progress: PROGRESS_STARTED,
        })
        .await
    }

    pub async fn set_progress(&self, id: JobId, progress: f32) -> Result<JobRecord, StoreError> {
        self.mutate(id, |_| JobState::Processing { progress }).await
    }

    pub async fn complete(&self, id: JobId, result: StemReferences) -> Result<JobRecord, StoreError> {
        self.mutate(id, |_| JobState::Completed { result }).await
    }

    /// Fail the job, keeping the last progress checkpoint it reached.
    pub async fn fail(&self, id: JobId, error: String) -> Result<JobRecord, StoreError> {
        self.mutate(id, |current| JobState::Failed {
            error,
            progress: current.progress(),
        })
        .await
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
