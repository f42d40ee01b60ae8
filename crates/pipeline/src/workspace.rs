//! Per-job temporary storage.
//!
//! A [`JobWorkspace`] owns the staged input file and the engine output
//! directory for one job. [`JobWorkspace::release`] consumes the guard, so
//! cleanup runs at most once; if a worker task is dropped before releasing
//! (panic, runtime shutdown) the `Drop` impl removes what it can.

use std::io;
use std::path::{Path, PathBuf};

use stemsplit_core::types::JobId;

pub struct JobWorkspace {
    job_id: JobId,
    input_path: PathBuf,
    output_dir: PathBuf,
    released: bool,
}

impl JobWorkspace {
    pub fn new(job_id: JobId, input_path: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            job_id,
            input_path,
            output_dir,
            released: false,
        }
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create the (empty) output directory.
    pub async fn allocate(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.output_dir).await
    }

    /// Delete the input file and the output directory.
    ///
    /// Missing paths are fine. Other failures are logged and swallowed; they
    /// never change the job's outcome.
    pub async fn release(mut self) {
        self.released = true;

        if let Err(e) = remove_file(&self.input_path).await {
            tracing::warn!(
                job_id = %self.job_id,
                path = %self.input_path.display(),
                error = %e,
                "Failed to delete job input",
            );
        }

        if let Err(e) = remove_dir(&self.output_dir).await {
            tracing::warn!(
                job_id = %self.job_id,
                path = %self.output_dir.display(),
                error = %e,
                "Failed to delete job workspace",
            );
        }

        tracing::debug!(job_id = %self.job_id, "Job workspace released");
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        tracing::warn!(job_id = %self.job_id, "Job workspace dropped without release");
        let _ = std::fs::remove_file(&self.input_path);
        let _ = std::fs::remove_dir_all(&self.output_dir);
    }
}

async fn remove_file(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

async fn remove_dir(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
