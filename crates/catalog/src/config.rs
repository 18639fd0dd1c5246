//! Defaults and environment-backed settings shared by the CLI and the server

use anyhow::{anyhow, Result};
use std::env;
use std::path::PathBuf;

/// Qdrant REST endpoint used when none is given
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";

/// Sentence embedding model used when none is given
pub const DEFAULT_MODEL_NAME: &str = "sentence-transformers/multi-qa-MiniLM-L6-cos-v1";

/// Collection written by ingestion and queried by the search service
pub const DEFAULT_COLLECTION: &str = "Device_info_db";

/// Number of neighbours returned per query
pub const DEFAULT_TOP_K: usize = 5;

/// Local address the web front end binds to
pub const DEFAULT_BIND: &str = "127.0.0.1:7860";

/// Environment variable overriding the catalog data directory
pub const CATALOG_ROOT_ENV: &str = "CATALOG_ROOT";

/// Get the catalog data directory (`$CATALOG_ROOT` or `~/.catalog`)
pub fn get_catalog_root() -> Result<PathBuf> {
  if let Ok(root) = env::var(CATALOG_ROOT_ENV) {
    if !root.trim().is_empty() {
      return Ok(PathBuf::from(root));
    }
  }

  dirs::home_dir()
    .map(|home| home.join(".catalog"))
    .ok_or_else(|| anyhow!("Could not determine home directory"))
}

/// Path of the web server's JSONL request log
pub fn get_server_logs_path() -> Result<PathBuf> {
  Ok(get_catalog_root()?.join("server.logs.jsonl"))
}
