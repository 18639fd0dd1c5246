use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

use catalog::embeddings::{HashingModelLoader, ModelCache};
use catalog::ingest::ingest_into;
use catalog::search::{SearchService, ERROR_MESSAGE};
use catalog::store::{MemoryStore, VectorStore};

const COLLECTION: &str = "Device_info_db";

fn devices_table() -> NamedTempFile {
  let mut file = NamedTempFile::new().unwrap();
  file
    .write_all(b"id;Description;Price\n1;<p>Phone</p>;100\n2;<p>Laptop</p>;500\n")
    .unwrap();
  file
}

fn hashing_cache() -> Arc<ModelCache> {
  Arc::new(ModelCache::new(Arc::new(HashingModelLoader::default())))
}

#[tokio::test]
async fn test_ingest_then_search_finds_phone() -> Result<()> {
  let table = devices_table();
  let cache = hashing_cache();
  let store = Arc::new(MemoryStore::new());

  let summary = ingest_into(table.path(), "hash", &cache, store.as_ref(), COLLECTION).await?;
  assert_eq!(summary.documents, 2);

  let service = SearchService::new(cache.clone(), store.clone(), "hash", COLLECTION);
  let results = service.search("Phone").await?;

  assert_eq!(results.len(), 2);
  assert_eq!(results[0].text, "Description: Phone\nPrice: 100\n\n");
  assert_eq!(cache.loaded_models().await, vec!["hash".to_string()]);
  Ok(())
}

#[tokio::test]
async fn test_repeated_ingest_keeps_one_point_per_row() -> Result<()> {
  let table = devices_table();
  let cache = hashing_cache();
  let store = MemoryStore::new();

  for _ in 0..3 {
    ingest_into(table.path(), "hash", &cache, &store, COLLECTION).await?;
  }

  assert_eq!(store.count_points(COLLECTION).await?, 2);
  Ok(())
}

#[tokio::test]
async fn test_limit_above_collection_size_returns_everything() -> Result<()> {
  let table = devices_table();
  let cache = hashing_cache();
  let store = Arc::new(MemoryStore::new());
  ingest_into(table.path(), "hash", &cache, store.as_ref(), COLLECTION).await?;

  let service = SearchService::new(cache, store, "hash", COLLECTION).with_limit(50);

  assert_eq!(service.search("anything").await?.len(), 2);
  Ok(())
}

#[tokio::test]
async fn test_query_against_other_collection_shows_error_text() {
  let table = devices_table();
  let cache = hashing_cache();
  let store = Arc::new(MemoryStore::new());
  ingest_into(table.path(), "hash", &cache, store.as_ref(), COLLECTION).await.unwrap();

  let service = SearchService::new(cache, store, "hash", "Other_db");

  assert_eq!(service.search_or_message("Phone").await.output, ERROR_MESSAGE);
}
