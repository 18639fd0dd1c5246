//! Index store contract: connect, destructive replace + upload, top-K search
//!
//! Each call logs failures with context and returns them unchanged.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{NewPoint, Payload, QdrantStore, ScoredPoint, VectorStore};
use crate::embeddings::Embedding;
use crate::error::CatalogError;
use crate::records::Document;

/// A ranked hit: store id, similarity score and the stored document text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchResult {
  /// Store-assigned point identifier
  pub id: String,
  /// Cosine similarity, higher is closer
  pub score: f32,
  /// Document text stored with the vector
  pub text: String,
}

impl From<ScoredPoint> for SearchResult {
  fn from(point: ScoredPoint) -> Self {
    Self { id: point.id.to_string(), score: point.score, text: point.payload.text }
  }
}

/// Open a handle to the Qdrant service at `url`
pub async fn initialize(url: &str) -> Result<QdrantStore> {
  QdrantStore::connect(url).await.map_err(|e| {
    error!(url, error = %e, "Failed to initialize vector store client");
    e
  })
}

/// Recreate `collection` sized to the embeddings, then upload every
/// (embedding, document) pair. Prior contents are discarded.
///
/// The two steps are separate requests: a failed upload leaves an empty
/// collection behind. Returns the number of uploaded points.
pub async fn replace_and_upload(
  store: &dyn VectorStore,
  collection: &str,
  embeddings: &[Embedding],
  documents: &[Document],
) -> Result<usize> {
  let dimension = validate_batch(collection, embeddings, documents).map_err(|e| {
    error!(collection, error = %e, "Refusing to replace collection");
    e
  })?;

  let points: Vec<NewPoint> = embeddings
    .iter()
    .zip(documents)
    .map(|(embedding, document)| NewPoint {
      vector: embedding.clone(),
      payload: Payload::new(document.as_str()),
    })
    .collect();
  let count = points.len();

  let outcome = async {
    store.recreate_collection(collection, dimension).await?;
    store.upload_points(collection, points).await
  }
  .await;

  outcome.map_err(|e| {
    error!(collection, error = %e, "Failed to interact with vector store");
    e
  })?;

  info!(collection, points = count, dimension, "Replaced collection contents");
  Ok(count)
}

/// Up to `k` nearest documents to `query_embedding`, most similar first
pub async fn search(
  store: &dyn VectorStore,
  collection: &str,
  query_embedding: &[f32],
  k: usize,
) -> Result<Vec<SearchResult>> {
  if k == 0 {
    let e = anyhow::Error::from(CatalogError::store("search limit must be at least 1"));
    error!(collection, error = %e, "Failed to search vector store");
    return Err(e);
  }

  let hits = store.search(collection, query_embedding, k).await.map_err(|e| {
    error!(collection, error = %e, "Failed to search vector store");
    e
  })?;

  Ok(hits.into_iter().take(k).map(SearchResult::from).collect())
}

/// Dimension shared by every embedding, checked against the document count
fn validate_batch(collection: &str, embeddings: &[Embedding], documents: &[Document]) -> Result<usize> {
  let Some(first) = embeddings.first() else {
    return Err(CatalogError::empty_batch(collection).into());
  };

  if embeddings.len() != documents.len() {
    return Err(
      CatalogError::mismatched_batch(
        collection,
        format!("{} embeddings for {} documents", embeddings.len(), documents.len()),
      )
      .into(),
    );
  }

  let dimension = first.len();
  if dimension == 0 {
    return Err(CatalogError::mismatched_batch(collection, "embeddings have zero dimension").into());
  }

  if let Some(position) = embeddings.iter().position(|embedding| embedding.len() != dimension) {
    return Err(
      CatalogError::mismatched_batch(
        collection,
        format!("embedding {position} has dimension {}, expected {dimension}", embeddings[position].len()),
      )
      .into(),
    );
  }

  Ok(dimension)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::{MemoryStore, MockVectorStore, PointId};
  use anyhow::anyhow;
  use mockall::predicate::eq;

  fn documents(texts: &[&str]) -> Vec<Document> {
    texts.iter().map(|text| Document::from(text.to_string())).collect()
  }

  #[tokio::test]
  async fn test_replace_and_upload_is_idempotent() -> Result<()> {
    let store = MemoryStore::new();
    let embeddings = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
    let docs = documents(&["Description: Phone\n\n", "Description: Laptop\n\n"]);

    replace_and_upload(&store, "items", &embeddings, &docs).await?;
    replace_and_upload(&store, "items", &embeddings, &docs).await?;

    assert_eq!(store.count_points("items").await?, 2);
    Ok(())
  }

  #[tokio::test]
  async fn test_empty_batch_fails_before_touching_store() {
    let mut store = MockVectorStore::new();
    store.expect_recreate_collection().never();
    store.expect_upload_points().never();

    let error = replace_and_upload(&store, "items", &[], &[]).await.unwrap_err();

    match error.downcast_ref::<CatalogError>() {
      Some(CatalogError::EmptyBatch { collection }) => assert_eq!(collection, "items"),
      other => panic!("Expected EmptyBatch error, got: {other:?}"),
    }
  }

  #[tokio::test]
  async fn test_mismatched_counts_are_rejected() {
    let store = MemoryStore::new();

    let error =
      replace_and_upload(&store, "items", &[vec![1.0]], &documents(&["a", "b"])).await.unwrap_err();

    assert!(matches!(
      error.downcast_ref::<CatalogError>(),
      Some(CatalogError::MismatchedBatch { .. })
    ));
  }

  #[tokio::test]
  async fn test_ragged_dimensions_are_rejected() {
    let store = MemoryStore::new();

    let result =
      replace_and_upload(&store, "items", &[vec![1.0, 0.0], vec![1.0]], &documents(&["a", "b"])).await;

    assert!(result.is_err());
    assert!(store.collection_names().await.is_empty());
  }

  #[tokio::test]
  async fn test_recreate_uses_first_embedding_dimension() -> Result<()> {
    let mut store = MockVectorStore::new();
    store
      .expect_recreate_collection()
      .with(eq("items"), eq(3))
      .times(1)
      .returning(|_, _| Ok(()));
    store
      .expect_upload_points()
      .withf(|collection, points| {
        collection == "items" && points.len() == 1 && points[0].payload.text == "Description: Phone\n\n"
      })
      .times(1)
      .returning(|_, _| Ok(()));

    let uploaded =
      replace_and_upload(&store, "items", &[vec![0.1, 0.2, 0.3]], &documents(&["Description: Phone\n\n"]))
        .await?;

    assert_eq!(uploaded, 1);
    Ok(())
  }

  #[tokio::test]
  async fn test_upload_failure_after_recreate_is_reported() {
    let mut store = MockVectorStore::new();
    store.expect_recreate_collection().times(1).returning(|_, _| Ok(()));
    store
      .expect_upload_points()
      .times(1)
      .returning(|_, _| Err(CatalogError::store("upload failed (500)").into()));

    let error = replace_and_upload(&store, "items", &[vec![1.0]], &documents(&["a"])).await.unwrap_err();

    assert!(matches!(error.downcast_ref::<CatalogError>(), Some(CatalogError::Store { .. })));
  }

  #[tokio::test]
  async fn test_search_maps_hits_and_respects_k() -> Result<()> {
    let mut store = MockVectorStore::new();
    store.expect_search().returning(|_, _, _| {
      Ok(vec![
        ScoredPoint { id: PointId::Num(1), score: 0.9, payload: Payload::new("Phone") },
        ScoredPoint { id: PointId::Num(2), score: 0.5, payload: Payload::new("Laptop") },
        ScoredPoint { id: PointId::Num(3), score: 0.1, payload: Payload::new("Tablet") },
      ])
    });

    let results = search(&store, "items", &[1.0], 2).await?;

    assert_eq!(
      results,
      vec![
        SearchResult { id: "1".to_string(), score: 0.9, text: "Phone".to_string() },
        SearchResult { id: "2".to_string(), score: 0.5, text: "Laptop".to_string() },
      ]
    );
    Ok(())
  }

  #[tokio::test]
  async fn test_search_with_zero_k_is_rejected() {
    let mut store = MockVectorStore::new();
    store.expect_search().never();

    let error = search(&store, "items", &[1.0], 0).await.unwrap_err();

    assert!(matches!(error.downcast_ref::<CatalogError>(), Some(CatalogError::Store { .. })));
  }

  #[tokio::test]
  async fn test_search_error_is_propagated() {
    let mut store = MockVectorStore::new();
    store.expect_search().returning(|_, _, _| Err(anyhow!("connection reset")));

    let error = search(&store, "items", &[1.0], 5).await.unwrap_err();

    assert!(error.to_string().contains("connection reset"));
  }

  #[tokio::test]
  async fn test_initialize_unreachable_store() {
    let error = initialize("http://127.0.0.1:1").await.err().unwrap();

    assert!(matches!(error.downcast_ref::<CatalogError>(), Some(CatalogError::Connection { .. })));
  }
}
