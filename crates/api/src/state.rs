use std::path::PathBuf;

use stemsplit_pipeline::Pipeline;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; the pipeline's parts are behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Job store, worker pool and submission service.
    pub pipeline: Pipeline,
    /// Directory served at `/files` when stems are published locally.
    pub files_dir: Option<PathBuf>,
}
