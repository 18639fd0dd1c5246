//! Ingestion pipeline: load records, embed them, replace the collection

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::embeddings::{Embedding, ModelCache};
use crate::records::{self, Document};
use crate::store::{self, VectorStore};

/// Inputs of one ingestion run
#[derive(Debug, Clone)]
pub struct IngestOptions {
  pub file_path: PathBuf,
  pub qdrant_url: String,
  pub model_name: String,
  pub collection: String,
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
  pub documents: usize,
  pub dimension: usize,
}

/// Load, embed, connect to Qdrant and replace the collection contents
pub async fn run_ingest(options: &IngestOptions, cache: &ModelCache) -> Result<IngestSummary> {
  let documents = records::load_documents(&options.file_path)?;
  let embeddings = embed_documents(&documents, &options.model_name, cache).await?;

  let client = store::initialize(&options.qdrant_url).await?;
  let summary = upload(&client, &options.collection, &embeddings, &documents).await?;

  info!(
    collection = %options.collection,
    documents = summary.documents,
    dimension = summary.dimension,
    "Qdrant index created"
  );
  Ok(summary)
}

/// Same pipeline against an already opened store
pub async fn ingest_into(
  file_path: &Path,
  model_name: &str,
  cache: &ModelCache,
  store: &dyn VectorStore,
  collection: &str,
) -> Result<IngestSummary> {
  let documents = records::load_documents(file_path)?;
  let embeddings = embed_documents(&documents, model_name, cache).await?;
  upload(store, collection, &embeddings, &documents).await
}

async fn embed_documents(
  documents: &[Document],
  model_name: &str,
  cache: &ModelCache,
) -> Result<Vec<Embedding>> {
  let texts: Vec<String> = documents.iter().map(|document| document.as_str().to_string()).collect();
  cache.embed(&texts, model_name).await
}

async fn upload(
  store: &dyn VectorStore,
  collection: &str,
  embeddings: &[Embedding],
  documents: &[Document],
) -> Result<IngestSummary> {
  let documents = store::replace_and_upload(store, collection, embeddings, documents).await?;
  let dimension = embeddings.first().map(Vec::len).unwrap_or_default();
  Ok(IngestSummary { documents, dimension })
}
