//! Request and response bodies with schemars annotations

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use super::request_log::{LogContext, LogEntry};
pub use crate::search::SearchOutput as SearchResponse;

// Search
// ======

/// Body of `POST /api/search`, also the form field of `POST /`
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SearchRequest {
  /// Free-text query
  #[serde(default)]
  pub query: String,
}

// Status
// ======

/// Response for `GET /status`
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
  pub status: String,

  /// Model used to embed queries
  pub model_name: String,

  /// Models loaded in this process
  pub loaded_models: Vec<String>,

  /// Collection queried by the front end
  pub collection: String,

  /// Points in the collection; null when the store cannot answer
  pub points: Option<usize>,

  /// Results returned per query
  pub limit: usize,

  pub version: String,
}

// Logs
// ====

/// Query string of `GET /logs`
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct LogsQuery {
  /// Maximum number of entries (default 100)
  pub limit: Option<usize>,

  /// Only entries of this level; `all` keeps everything
  pub level: Option<String>,
}

/// Response for `GET /logs`
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct LogsResponse {
  /// Entries, newest first
  pub logs: Vec<LogEntry>,
}

/// Error body for non-2xx responses
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiError {
  /// Error key, unique to the error source
  pub key: String,

  /// Human readable error message
  pub message: String,
}

impl ApiError {
  pub fn new(key: &str, message: &str) -> Self {
    Self { key: key.to_string(), message: message.to_string() }
  }
}
