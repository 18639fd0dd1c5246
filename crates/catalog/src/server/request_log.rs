//! Persistent JSONL request log for the web front end
//!
//! One JSON object per line, appended as requests are served. Writes and
//! reads share one lock so readers never see a half-written line.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Request details attached to an entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LogContext {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub request_id: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub method: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub path: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub status_code: Option<u16>,

  /// Request duration in milliseconds
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LogEntry {
  pub timestamp: DateTime<Utc>,
  pub level: String,
  pub message: String,
  pub component: String,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub context: Option<LogContext>,
}

/// Append-only request log shared by every handler
#[derive(Clone)]
pub struct RequestLog {
  path: Arc<Mutex<PathBuf>>,
}

impl RequestLog {
  /// Open the log at `path`, creating parent directories and the file if needed
  pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(&path)?;

    Ok(Self { path: Arc::new(Mutex::new(path)) })
  }

  pub async fn path(&self) -> PathBuf {
    self.path.lock().await.clone()
  }

  pub async fn append(
    &self,
    level: &str,
    message: &str,
    component: &str,
    context: Option<LogContext>,
  ) -> io::Result<()> {
    let entry = LogEntry {
      timestamp: Utc::now(),
      level: level.to_string(),
      message: message.to_string(),
      component: component.to_string(),
      context,
    };
    let line = serde_json::to_string(&entry).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let path = self.path.lock().await;
    let mut file = OpenOptions::new().create(true).append(true).open(&*path)?;
    writeln!(file, "{line}")?;
    file.flush()
  }

  /// Append, dropping any write failure
  pub async fn log(&self, level: &str, message: &str, component: &str, context: Option<LogContext>) {
    if let Err(e) = self.append(level, message, component, context).await {
      tracing::warn!(error = %e, "Failed to write request log entry");
    }
  }

  /// Most recent entries first. `level` of `None` or `"all"` keeps every level.
  /// Malformed lines are skipped.
  pub async fn entries(&self, limit: Option<usize>, level: Option<&str>) -> io::Result<Vec<LogEntry>> {
    let path = self.path.lock().await;
    if !path.exists() {
      return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(&*path)?);
    let mut entries = Vec::new();
    for line in reader.lines() {
      let line = line?;
      if line.trim().is_empty() {
        continue;
      }

      let Ok(entry) = serde_json::from_str::<LogEntry>(&line) else {
        continue;
      };
      if level.is_none_or(|filter| filter == "all" || entry.level == filter) {
        entries.push(entry);
      }
    }

    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    if let Some(limit) = limit {
      entries.truncate(limit);
    }
    Ok(entries)
  }
}
