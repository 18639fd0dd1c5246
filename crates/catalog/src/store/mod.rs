//! Vector store abstraction layer for catalog storage and retrieval
//!
//! This module provides a generic interface for vector store operations so
//! different backends (Qdrant over REST, an in-process store for tests) can
//! be swapped without changing the ingestion or query pipelines.

pub mod memory;
pub mod operations;
pub mod qdrant;

pub use memory::MemoryStore;
pub use operations::{initialize, replace_and_upload, search, SearchResult};
pub use qdrant::QdrantStore;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Data stored next to each vector and returned with search hits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
  #[serde(default)]
  pub text: String,
}

impl Payload {
  pub fn new(text: impl Into<String>) -> Self {
    Self { text: text.into() }
  }
}

/// A vector to upload. The store assigns the identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPoint {
  pub vector: Vec<f32>,
  pub payload: Payload,
}

/// Store-assigned point identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
  Num(u64),
  Uuid(String),
}

impl fmt::Display for PointId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PointId::Num(id) => write!(f, "{id}"),
      PointId::Uuid(id) => f.write_str(id),
    }
  }
}

/// One search hit, as returned by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
  pub id: PointId,
  pub score: f32,
  pub payload: Payload,
}

/// Vector store interface for collections of (vector, payload) points
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
  /// Drop `collection` if present and create it empty with cosine distance
  async fn recreate_collection(&self, collection: &str, dimension: usize) -> Result<()>;

  /// Add points to an existing collection
  async fn upload_points(&self, collection: &str, points: Vec<NewPoint>) -> Result<()>;

  /// Up to `limit` nearest points, most similar first
  async fn search(&self, collection: &str, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>>;

  /// Number of points stored in `collection`
  async fn count_points(&self, collection: &str) -> Result<usize>;
}
