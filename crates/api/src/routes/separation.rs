//! Route definitions for submitting and polling separation jobs.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{models, separation};
use crate::state::AppState;

/// ```text
/// POST   /separate        -> submit_separation
/// GET    /status/{id}     -> get_status
/// GET    /models          -> list_models
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/separate", post(separation::submit_separation))
        .route("/status/{id}", get(separation::get_status))
        .route("/models", get(models::list_models))
}
