//! Job submission.
//!
//! Stages the upload under a job-unique name, reserves a queue slot,
//! creates the `Queued` record and hands the ticket to the pool, all
//! without waiting for the job to run.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;

use stemsplit_core::request::SeparationRequest;
use stemsplit_core::types::{new_job_id, JobId};

use crate::error::SubmitError;
use crate::pool::{JobCompletion, WorkerPool};
use crate::store::{JobRecord, JobStore};
use crate::worker::JobTicket;

/// Longest file extension carried over from the uploaded file name.
const MAX_EXTENSION_LEN: usize = 10;

/// An accepted submission.
pub struct Submitted {
    pub record: JobRecord,
    /// Resolves when the job reaches a terminal state. May be dropped.
    pub completion: JobCompletion,
}

impl Submitted {
    pub fn id(&self) -> JobId {
        self.record.id
    }
}

pub struct SubmissionService {
    store: Arc<JobStore>,
    pool: WorkerPool,
    uploads_dir: PathBuf,
}

impl SubmissionService {
    pub fn new(store: Arc<JobStore>, pool: WorkerPool, uploads_dir: PathBuf) -> Self {
        Self {
            store,
            pool,
            uploads_dir,
        }
    }

    /// Accept a validated request and its audio payload.
    ///
    /// `file_name` is the client-supplied name; only its extension is kept.
    /// On any error the staged file is removed and no record exists.
    pub async fn submit(
        &self,
        file_name: Option<&str>,
        payload: &[u8],
        request: SeparationRequest,
    ) -> Result<Submitted, SubmitError> {
        if payload.is_empty() {
            return Err(SubmitError::EmptyUpload);
        }

        let id = new_job_id();
        let input_path = self.staged_path(id, file_name);

        if let Err(e) = stage(&input_path, payload).await {
            discard(&input_path).await;
            tracing::error!(job_id = %id, error = %e, "Failed to stage upload");
            return Err(SubmitError::Staging(e));
        }

        let reservation = match self.pool.reserve() {
            Ok(reservation) => reservation,
            Err(e) => {
                discard(&input_path).await;
                tracing::warn!(job_id = %id, error = %e, "Submission rejected");
                return Err(e.into());
            }
        };

        let record = match self
            .store
            .create(id, request.clone(), input_path.clone())
            .await
        {
            Ok(record) => record,
            Err(e) => {
                discard(&input_path).await;
                return Err(e.into());
            }
        };

        let completion = reservation.dispatch(JobTicket {
            id,
            request,
            input_path,
        });

        tracing::info!(
            job_id = %id,
            model = %record.request.model,
            bytes = payload.len(),
            "Job queued",
        );

        Ok(Submitted { record, completion })
    }

    fn staged_path(&self, id: JobId, file_name: Option<&str>) -> PathBuf {
        match file_name.and_then(upload_extension) {
            Some(ext) => self.uploads_dir.join(format!("{id}.{ext}")),
            None => self.uploads_dir.join(id.to_string()),
        }
    }
}

/// Extension of an uploaded file name, if it is short and alphanumeric.
fn upload_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?;
    let valid = !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}

async fn stage(path: &Path, payload: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(payload).await?;
    file.sync_all().await
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to delete staged upload");
        }
    }
}
