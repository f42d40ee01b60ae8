use axum::Json;

use stemsplit_core::models::SeparationModel;

/// GET /models
///
/// Supported separation model ids, default first.
pub async fn list_models() -> Json<Vec<&'static str>> {
    Json(SeparationModel::all_ids())
}
