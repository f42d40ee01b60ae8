//! Job lifecycle state machine.
//!
//! ```text
//! Queued --start--> Processing --success--> Completed
//!                        |
//!                        +------failure---> Failed
//! ```
//!
//! `Completed` and `Failed` are terminal. A `Completed` job always carries a
//! full [`StemReferences`] and a `Failed` job always carries an error
//! message, so a reader can never observe one without the other.

use serde::{Deserialize, Serialize};

use crate::stems::Stem;

/// Progress checkpoint: worker picked the job up.
pub const PROGRESS_STARTED: f32 = 0.1;

/// Progress checkpoint: engine invocation began.
pub const PROGRESS_ENGINE_RUNNING: f32 = 0.2;

/// Progress checkpoint: engine finished, artifacts being discovered.
pub const PROGRESS_ENGINE_DONE: f32 = 0.8;

/// Progress checkpoint: result published.
pub const PROGRESS_DONE: f32 = 1.0;

/// Flat status label exposed to polling clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Published reference for each canonical stem.
///
/// A struct rather than a map: a result with fewer than four stems cannot
/// be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StemReferences {
    pub vocals: String,
    pub drums: String,
    pub bass: String,
    pub other: String,
}

impl StemReferences {
    /// Build a result by asking `f` for each stem's reference.
    pub fn from_fn(mut f: impl FnMut(Stem) -> String) -> Self {
        Self {
            vocals: f(Stem::Vocals),
            drums: f(Stem::Drums),
            bass: f(Stem::Bass),
            other: f(Stem::Other),
        }
    }

    pub fn get(&self, stem: Stem) -> &str {
        match stem {
            Stem::Vocals => &self.vocals,
            Stem::Drums => &self.drums,
            Stem::Bass => &self.bass,
            Stem::Other => &self.other,
        }
    }
}

/// Current state of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Queued,
    Processing { progress: f32 },
    Completed { result: StemReferences },
    /// `progress` is the last checkpoint reached before the failure.
    Failed { error: String, progress: f32 },
}

/// Reasons a state change is refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("job is already {0} and cannot change state")]
    Terminal(&'static str),

    #[error("invalid transition from {from} to {to}")]
    Invalid {
        from: &'static str,
        to: &'static str,
    },

    #[error("progress may not decrease (from {from} to {to})")]
    ProgressRegression { from: f32, to: f32 },

    #[error("progress {0} is outside [0.0, 1.0]")]
    ProgressOutOfRange(f32),
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Queued => JobStatus::Queued,
            Self::Processing { .. } => JobStatus::Processing,
            Self::Completed { .. } => JobStatus::Completed,
            Self::Failed { .. } => JobStatus::Failed,
        }
    }

    pub fn progress(&self) -> f32 {
        match self {
            Self::Queued => 0.0,
            Self::Processing { progress } | Self::Failed { progress, .. } => *progress,
            Self::Completed { .. } => PROGRESS_DONE,
        }
    }

    pub fn result(&self) -> Option<&StemReferences> {
        match self {
            Self::Completed { result } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Check that moving from `self` to `next` is a legal step.
    ///
    /// Legal steps: `Queued -> Processing`, `Processing -> Processing` with
    /// non-decreasing progress, and `Processing -> Completed | Failed`.
    pub fn check_transition(&self, next: &JobState) -> Result<(), TransitionError> {
        let progress = next.progress();
        if !(0.0..=1.0).contains(&progress) {
            return Err(TransitionError::ProgressOutOfRange(progress));
        }

        match (self, next) {
            (current, _) if current.is_terminal() => {
                Err(TransitionError::Terminal(current.status().as_str()))
            }
            (Self::Queued, Self::Processing { .. }) => Ok(()),
            (Self::Processing { progress: from }, Self::Processing { progress: to })
            | (Self::Processing { progress: from }, Self::Failed { progress: to, .. }) => {
                if to < from {
                    Err(TransitionError::ProgressRegression {
                        from: *from,
                        to: *to,
                    })
                } else {
                    Ok(())
                }
            }
            (Self::Processing { .. }, Self::Completed { .. }) => Ok(()),
            (current, next) => Err(TransitionError::Invalid {
                from: current.status().as_str(),
                to: next.status().as_str(),
            }),
        }
    }
}
