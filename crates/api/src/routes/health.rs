use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Jobs currently being separated.
    pub running_jobs: usize,
    /// Worker pool size.
    pub max_concurrent_jobs: usize,
}

/// GET /health -- returns service status and worker pool occupancy.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let pool = &state.pipeline.pool;

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        running_jobs: pool.running(),
        max_concurrent_jobs: pool.max_concurrent(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
