//! Status endpoint handler

use axum::{extract::State, response::Json};

use crate::server::{types::StatusResponse, AppState};

/// GET /status - Health check with model and collection details
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
  let search = &state.search;

  Json(StatusResponse {
    status: "healthy".to_string(),
    model_name: search.model_name().to_string(),
    loaded_models: search.loaded_models().await,
    collection: search.collection().to_string(),
    points: search.point_count().await,
    limit: search.limit(),
    version: env!("CARGO_PKG_VERSION").to_string(),
  })
}
