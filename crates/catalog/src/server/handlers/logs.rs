//! Logs endpoint handler

use axum::{
  extract::{Extension, Query, State},
  http::StatusCode,
  response::Json,
};

use crate::server::{
  middleware::RequestContext,
  types::{ApiError, LogsQuery, LogsResponse},
  AppState,
};

const DEFAULT_LIMIT: usize = 100;

/// GET /logs - Recent request log entries, newest first
pub async fn get_logs(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  Query(query): Query<LogsQuery>,
) -> Result<Json<LogsResponse>, (StatusCode, Json<ApiError>)> {
  let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

  match state.request_log.entries(Some(limit), query.level.as_deref()).await {
    Ok(logs) => Ok(Json(LogsResponse { logs })),
    Err(e) => {
      let message = format!("Failed to read logs: {e}");
      context.log_error(&message, "logs-api").await;
      Err((StatusCode::INTERNAL_SERVER_ERROR, Json(ApiError::new("logs_read_failed", &message))))
    }
  }
}
