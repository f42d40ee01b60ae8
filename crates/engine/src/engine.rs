//! Engine trait and shared types.

use std::path::PathBuf;

use stemsplit_core::models::SeparationModel;
use stemsplit_core::stems::Stem;

/// Everything the engine needs for one run.
#[derive(Debug, Clone)]
pub struct EngineJob {
    /// Staged input audio file.
    pub input_path: PathBuf,
    /// Directory the engine writes its layout under. Must exist.
    pub output_dir: PathBuf,
    pub model: SeparationModel,
    /// Two-stem mode target, if any.
    pub reduction_target: Option<Stem>,
    /// Number of shifted inference passes (>= 1).
    pub passes: u32,
}

/// Errors from running the separation engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine program could not be spawned at all.
    #[error("separation engine '{program}' could not be started: {source}")]
    NotFound {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine exceeded its wall-clock budget and was killed.
    #[error("separation engine timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The engine ran but exited unsuccessfully.
    #[error("separation engine exited with code {exit_code}: {stderr}")]
    Failed { exit_code: i32, stderr: String },

    #[error("I/O error while running separation engine: {0}")]
    Io(#[from] std::io::Error),
}

/// A process that separates an audio file into stems on disk.
///
/// Implementations block (asynchronously) for the whole separation and
/// report failure loudly; they never inspect or clean up the output.
#[async_trait::async_trait]
pub trait SeparationEngine: Send + Sync {
    async fn separate(&self, job: &EngineJob) -> Result<(), EngineError>;
}
