//! Handlers for submitting separation jobs and polling their status.

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use stemsplit_core::error::CoreError;
use stemsplit_core::job::{JobStatus, StemReferences};
use stemsplit_core::request::SeparationRequest;
use stemsplit_core::types::{JobId, Timestamp};
use stemsplit_pipeline::store::JobRecord;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Body of `202 Accepted` for a new job.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: JobId,
    pub status: JobStatus,
}

/// Read-only projection of a job record.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<StemReferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&JobRecord> for JobStatusResponse {
    fn from(record: &JobRecord) -> Self {
        Self {
            id: record.id,
            status: record.state.status(),
            progress: record.state.progress(),
            result: record.state.result().cloned(),
            error: record.state.error().map(str::to_owned),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /separate
///
/// Multipart form with a required `file` field and optional `model`,
/// `reduction_target` and `passes` fields. Returns immediately with the new
/// job's id; the separation runs in the background.
pub async fn submit_separation(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<SubmitResponse>)> {
    let mut upload: Option<(Option<String>, Bytes)> = None;
    let mut model: Option<String> = None;
    let mut reduction_target: Option<String> = None;
    let mut passes: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_owned);
                let data = field.bytes().await.map_err(multipart_error)?;
                upload = Some((file_name, data));
            }
            "model" => model = Some(field.text().await.map_err(multipart_error)?),
            "reduction_target" => {
                reduction_target = Some(field.text().await.map_err(multipart_error)?)
            }
            "passes" => passes = Some(field.text().await.map_err(multipart_error)?),
            _ => {} // ignore unknown fields
        }
    }

    let (file_name, data) =
        upload.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;

    let request = SeparationRequest::from_form(
        model.as_deref(),
        reduction_target.as_deref(),
        passes.as_deref(),
    )
    .map_err(CoreError::from)?;

    let submitted = state
        .pipeline
        .submission
        .submit(file_name.as_deref(), &data, request)
        .await
        .map_err(CoreError::from)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            id: submitted.id(),
            status: JobStatus::Queued,
        }),
    ))
}

/// Map multipart parsing failures, keeping the body-limit case distinct.
fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /status/{id}
///
/// Ids that are not UUIDs cannot name a job and are reported as not found.
pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<JobStatusResponse>> {
    let job_id: JobId = id.parse().map_err(|_| CoreError::NotFound {
        entity: "Job",
        id: id.clone(),
    })?;

    let record = state
        .pipeline
        .store
        .get(job_id)
        .await
        .map_err(CoreError::from)?;

    Ok(Json(JobStatusResponse::from(&record)))
}
