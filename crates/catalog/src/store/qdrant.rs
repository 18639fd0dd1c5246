//! Qdrant REST adapter

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use super::{NewPoint, Payload, PointId, ScoredPoint, VectorStore};
use crate::error::CatalogError;

/// Points per upload request
const UPLOAD_BATCH_SIZE: usize = 64;

/// Handle to a Qdrant service. One handle is created at startup and reused.
#[derive(Clone)]
pub struct QdrantStore {
  http: Client,
  base_url: String,
}

#[derive(Deserialize)]
struct QdrantResponse<T> {
  result: T,
}

#[derive(Deserialize)]
struct ServiceInfo {
  #[serde(default)]
  title: Option<String>,
  #[serde(default)]
  version: Option<String>,
}

#[derive(Serialize)]
struct UploadPoint<'a> {
  id: String,
  vector: &'a [f32],
  payload: &'a Payload,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
  vector: &'a [f32],
  limit: usize,
  with_payload: bool,
}

#[derive(Deserialize)]
struct SearchEntry {
  id: PointId,
  score: f32,
  #[serde(default)]
  payload: Option<Payload>,
}

#[derive(Deserialize)]
struct CollectionInfo {
  #[serde(default)]
  points_count: Option<usize>,
}

impl QdrantStore {
  /// Connect to the service at `url`, failing if it cannot be reached
  pub async fn connect(url: &str) -> Result<Self> {
    let base_url = url.trim_end_matches('/').to_string();
    let http = Client::builder()
      .build()
      .map_err(|e| CatalogError::connection(&base_url, format!("Failed to build HTTP client: {e}")))?;

    let response = http
      .get(&base_url)
      .send()
      .await
      .map_err(|e| CatalogError::connection(&base_url, e.to_string()))?;

    if !response.status().is_success() {
      return Err(
        CatalogError::connection(&base_url, format!("unexpected status {}", response.status())).into(),
      );
    }

    let info: ServiceInfo = response
      .json()
      .await
      .map_err(|e| CatalogError::connection(&base_url, format!("not a Qdrant service: {e}")))?;

    info!(
      url = %base_url,
      service = info.title.as_deref().unwrap_or("qdrant"),
      version = info.version.as_deref().unwrap_or("unknown"),
      "Connected to vector store"
    );
    Ok(Self { http, base_url })
  }

  /// `<base>/collections/<collection>/<tail..>`, each segment percent-encoded
  fn collection_url(&self, collection: &str, tail: &[&str]) -> Result<Url> {
    let mut url = Url::parse(&self.base_url)
      .map_err(|e| CatalogError::store(format!("invalid Qdrant URL '{}': {e}", self.base_url)))?;
    {
      let mut segments = url
        .path_segments_mut()
        .map_err(|_| CatalogError::store(format!("Qdrant URL '{}' cannot take a path", self.base_url)))?;
      segments.pop_if_empty().push("collections").push(collection).extend(tail);
    }
    Ok(url)
  }

  async fn send(&self, request: reqwest::RequestBuilder, action: &str) -> Result<Response> {
    let response = request
      .send()
      .await
      .map_err(|e| CatalogError::store(format!("{action}: {e}")))?;
    check_status(response, action).await
  }

  async fn upload_batch(&self, collection: &str, batch: &[NewPoint]) -> Result<()> {
    let points: Vec<UploadPoint<'_>> = batch
      .iter()
      .map(|point| UploadPoint {
        id: Uuid::new_v4().to_string(),
        vector: &point.vector,
        payload: &point.payload,
      })
      .collect();

    let request = self
      .http
      .put(self.collection_url(collection, &["points"])?)
      .query(&[("wait", "true")])
      .json(&json!({ "points": points }));

    self.send(request, &format!("upload points to '{collection}'")).await?;
    Ok(())
  }
}

async fn check_status(response: Response, action: &str) -> Result<Response> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let body = response.text().await.unwrap_or_default();
  Err(CatalogError::store(format!("{action} failed ({status}): {body}")).into())
}

async fn parse_result<T: serde::de::DeserializeOwned>(response: Response, action: &str) -> Result<T> {
  let body: QdrantResponse<T> = response
    .json()
    .await
    .map_err(|e| CatalogError::store(format!("{action}: malformed response: {e}")))?;
  Ok(body.result)
}

#[async_trait]
impl VectorStore for QdrantStore {
  async fn recreate_collection(&self, collection: &str, dimension: usize) -> Result<()> {
    let url = self.collection_url(collection, &[])?;

    let response = self
      .http
      .delete(url.clone())
      .send()
      .await
      .map_err(|e| CatalogError::store(format!("delete collection '{collection}': {e}")))?;
    if response.status() != reqwest::StatusCode::NOT_FOUND {
      check_status(response, &format!("delete collection '{collection}'")).await?;
    }

    let body = json!({ "vectors": { "size": dimension, "distance": "Cosine" } });
    self.send(self.http.put(url).json(&body), &format!("create collection '{collection}'")).await?;

    info!(collection, dimension, "Recreated collection");
    Ok(())
  }

  async fn upload_points(&self, collection: &str, points: Vec<NewPoint>) -> Result<()> {
    for (index, batch) in points.chunks(UPLOAD_BATCH_SIZE).enumerate() {
      self.upload_batch(collection, batch).await?;
      debug!(collection, batch = index, points = batch.len(), "Uploaded batch");
    }
    Ok(())
  }

  async fn search(&self, collection: &str, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>> {
    let action = format!("search '{collection}'");
    let request = self
      .http
      .post(self.collection_url(collection, &["points", "search"])?)
      .json(&SearchRequest { vector, limit, with_payload: true });

    let response = self.send(request, &action).await?;
    let entries: Vec<SearchEntry> = parse_result(response, &action).await?;

    Ok(
      entries
        .into_iter()
        .map(|entry| ScoredPoint {
          id: entry.id,
          score: entry.score,
          payload: entry.payload.unwrap_or_default(),
        })
        .collect(),
    )
  }

  async fn count_points(&self, collection: &str) -> Result<usize> {
    let action = format!("describe collection '{collection}'");
    let response = self.send(self.http.get(self.collection_url(collection, &[])?), &action).await?;
    let info: CollectionInfo = parse_result(response, &action).await?;
    Ok(info.points_count.unwrap_or_default())
  }
}
