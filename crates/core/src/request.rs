//! Validation of separation submissions.
//!
//! [`SeparationRequest::from_form`] turns the raw form fields of a
//! submission into a validated request. A request that fails here never
//! creates a job.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::models::SeparationModel;
use crate::stems::Stem;

/// Default number of engine passes (`--shifts`).
pub const DEFAULT_PASSES: u32 = 1;

/// Rejections raised synchronously at submission time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid model '{model}'. Choose one of: {supported}", supported = SeparationModel::all_ids().join(", "))]
    InvalidModel { model: String },

    #[error("Invalid reduction_target '{target}'. Must be one of: vocals, drums, bass, other")]
    InvalidReductionTarget { target: String },

    #[error("Invalid passes '{value}'. Must be an integer of at least 1")]
    InvalidPasses { value: String },
}

impl From<ValidationError> for CoreError {
    fn from(err: ValidationError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

/// Validated configuration for one separation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SeparationRequest {
    pub model: SeparationModel,
    /// When set, the engine runs in two-stem mode isolating this stem.
    pub reduction_target: Option<Stem>,
    #[validate(range(min = 1))]
    pub passes: u32,
}

impl Default for SeparationRequest {
    fn default() -> Self {
        Self {
            model: SeparationModel::default(),
            reduction_target: None,
            passes: DEFAULT_PASSES,
        }
    }
}

impl SeparationRequest {
    /// Build a request from raw form values.
    ///
    /// - `model` defaults to [`SeparationModel::default`] when absent.
    /// - An empty `reduction_target` is treated as absent.
    /// - `passes` defaults to [`DEFAULT_PASSES`] when absent or blank.
    pub fn from_form(
        model: Option<&str>,
        reduction_target: Option<&str>,
        passes: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let model = match model.map(str::trim) {
            None => SeparationModel::default(),
            Some(raw) => raw
                .parse::<SeparationModel>()
                .map_err(|_| ValidationError::InvalidModel {
                    model: raw.to_string(),
                })?,
        };

        let reduction_target = match reduction_target.map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<Stem>().map_err(|_| {
                ValidationError::InvalidReductionTarget {
                    target: raw.to_string(),
                }
            })?),
        };

        let passes = match passes.map(str::trim) {
            None | Some("") => DEFAULT_PASSES,
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| ValidationError::InvalidPasses {
                    value: raw.to_string(),
                })?,
        };

        let request = Self {
            model,
            reduction_target,
            passes,
        };

        request
            .validate()
            .map_err(|_| ValidationError::InvalidPasses {
                value: passes.to_string(),
            })?;

        Ok(request)
    }
}
