//! Process-wide model registry keyed by model name

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use super::{Embedding, EmbeddingModel, ModelLoader};
use crate::error::CatalogError;

type SharedModel = Arc<Mutex<Box<dyn EmbeddingModel>>>;

/// Loads each model name once and reuses it for the lifetime of the cache.
///
/// The registry lock is held across check-then-load, so concurrent first use
/// of the same name waits for a single load instead of racing. Nothing is
/// ever evicted.
pub struct ModelCache {
  loader: Arc<dyn ModelLoader>,
  models: Mutex<HashMap<String, SharedModel>>,
}

impl ModelCache {
  pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
    Self { loader, models: Mutex::new(HashMap::new()) }
  }

  /// Get the cached model for `model_name`, loading it on first use
  pub async fn model(&self, model_name: &str) -> Result<SharedModel> {
    let mut models = self.models.lock().await;
    if let Some(model) = models.get(model_name) {
      return Ok(model.clone());
    }

    info!(model = model_name, "Loading embedding model");
    let model = self.loader.load(model_name).await.map_err(|e| {
      error!(model = model_name, error = ?e, "Failed to load embedding model");
      as_model_load_error(model_name, e)
    })?;
    info!(model = model_name, "Embedding model ready");

    let model = Arc::new(Mutex::new(model));
    models.insert(model_name.to_string(), model.clone());
    Ok(model)
  }

  /// Encode `texts` with `model_name`. Batch and single-item calls share this path.
  pub async fn embed(&self, texts: &[String], model_name: &str) -> Result<Vec<Embedding>> {
    let model = self.model(model_name).await?;
    if texts.is_empty() {
      return Ok(Vec::new());
    }

    let mut model = model.lock().await;
    let embeddings = model.embed(texts).map_err(|e| {
      error!(model = model_name, texts = texts.len(), error = ?e, "Failed to encode texts");
      anyhow::Error::from(CatalogError::encoding(model_name, texts.len(), format!("{e:#}")))
    })?;

    validate_embeddings(model_name, texts.len(), &embeddings)?;
    Ok(embeddings)
  }

  /// Names of the models loaded so far, sorted
  pub async fn loaded_models(&self) -> Vec<String> {
    let mut names: Vec<String> = self.models.lock().await.keys().cloned().collect();
    names.sort();
    names
  }
}

/// Keep an existing `ModelLoad` error as is; wrap anything else
fn as_model_load_error(model_name: &str, error: anyhow::Error) -> anyhow::Error {
  match error.downcast_ref::<CatalogError>() {
    Some(CatalogError::ModelLoad { .. }) => error,
    _ => CatalogError::model_load(model_name, format!("{error:#}")).into(),
  }
}

/// One vector per text, all of the same non-zero dimension
fn validate_embeddings(model_name: &str, expected: usize, embeddings: &[Embedding]) -> Result<()> {
  let failure = |message: String| {
    error!(model = model_name, error = %message, "Model returned an invalid batch");
    anyhow::Error::from(CatalogError::encoding(model_name, expected, message))
  };

  if embeddings.len() != expected {
    return Err(failure(format!("expected {expected} embeddings, got {}", embeddings.len())));
  }

  let dimension = embeddings.first().map(Vec::len).unwrap_or_default();
  if dimension == 0 {
    return Err(failure("model produced zero-dimension embeddings".to_string()));
  }

  if let Some(position) = embeddings.iter().position(|embedding| embedding.len() != dimension) {
    return Err(failure(format!(
      "embedding {position} has dimension {}, expected {dimension}",
      embeddings[position].len()
    )));
  }

  Ok(())
}
