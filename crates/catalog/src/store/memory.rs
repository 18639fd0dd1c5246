//! In-process vector store with the same contract as the Qdrant adapter

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NewPoint, Payload, PointId, ScoredPoint, VectorStore};
use crate::error::CatalogError;

struct StoredPoint {
  id: PointId,
  vector: Vec<f32>,
  payload: Payload,
}

struct Collection {
  dimension: usize,
  points: Vec<StoredPoint>,
}

/// Exact cosine search over vectors held in memory. Ties keep insertion order.
#[derive(Default)]
pub struct MemoryStore {
  collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Names of the existing collections, sorted
  pub async fn collection_names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
    names.sort();
    names
  }
}

fn missing_collection(collection: &str) -> anyhow::Error {
  CatalogError::store(format!("Not found: Collection `{collection}` doesn't exist!")).into()
}

fn check_dimension(collection: &str, expected: usize, actual: usize) -> Result<()> {
  if expected != actual {
    return Err(
      CatalogError::store(format!(
        "Wrong input: Vector dimension error: expected dim: {expected}, got {actual} (collection `{collection}`)"
      ))
      .into(),
    );
  }
  Ok(())
}

#[async_trait]
impl VectorStore for MemoryStore {
  async fn recreate_collection(&self, collection: &str, dimension: usize) -> Result<()> {
    if dimension == 0 {
      return Err(CatalogError::store("Wrong input: vector size must be greater than 0").into());
    }

    let mut collections = self.collections.write().await;
    collections.insert(collection.to_string(), Collection { dimension, points: Vec::new() });
    Ok(())
  }

  async fn upload_points(&self, collection: &str, points: Vec<NewPoint>) -> Result<()> {
    let mut collections = self.collections.write().await;
    let target = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;

    for point in &points {
      check_dimension(collection, target.dimension, point.vector.len())?;
    }

    target.points.extend(points.into_iter().map(|point| StoredPoint {
      id: PointId::Uuid(Uuid::new_v4().to_string()),
      vector: point.vector,
      payload: point.payload,
    }));
    Ok(())
  }

  async fn search(&self, collection: &str, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>> {
    let collections = self.collections.read().await;
    let target = collections.get(collection).ok_or_else(|| missing_collection(collection))?;
    check_dimension(collection, target.dimension, vector.len())?;

    let mut hits: Vec<ScoredPoint> = target
      .points
      .iter()
      .map(|point| ScoredPoint {
        id: point.id.clone(),
        score: cosine_similarity(vector, &point.vector),
        payload: point.payload.clone(),
      })
      .collect();

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(limit);
    Ok(hits)
  }

  async fn count_points(&self, collection: &str) -> Result<usize> {
    let collections = self.collections.read().await;
    let target = collections.get(collection).ok_or_else(|| missing_collection(collection))?;
    Ok(target.points.len())
  }
}

/// Cosine similarity in [-1, 1]; 0 for zero vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
  let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
  let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
  let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

  if norm_a == 0.0 || norm_b == 0.0 {
    return 0.0;
  }

  dot_product / (norm_a * norm_b)
}
