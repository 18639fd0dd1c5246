//! Embedding provider: text in, fixed-dimension vectors out
//!
//! Models are reached through two capability traits so any backend can be
//! swapped in. [`ModelLoader`] resolves a model by name, [`EmbeddingModel`]
//! encodes batches. [`ModelCache`] owns the loaded models and makes sure each
//! name is loaded at most once per process.

pub mod cache;
pub mod hashing;
pub mod pooling;

#[cfg(feature = "ml-features")]
pub mod onnx;

pub use cache::ModelCache;
pub use hashing::{HashingEmbeddingModel, HashingModelLoader, HASH_DIMENSIONS};

use anyhow::Result;
use async_trait::async_trait;
use clap::ValueEnum;
use std::sync::Arc;

/// Fixed-length vector produced for one document or query
pub type Embedding = Vec<f32>;

/// A loaded model able to encode text batches
pub trait EmbeddingModel: Send {
  /// Encode `texts`, returning one vector per text in the same order
  fn embed(&mut self, texts: &[String]) -> Result<Vec<Embedding>>;
}

/// Resolves and loads models by name. Loading may be slow (download + session setup).
#[async_trait]
pub trait ModelLoader: Send + Sync {
  async fn load(&self, model_name: &str) -> Result<Box<dyn EmbeddingModel>>;
}

/// Embedding backend selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EmbedderKind {
  /// Sentence-transformers ONNX export fetched from the Hugging Face hub
  #[default]
  Onnx,
  /// Deterministic offline feature hashing
  Hash,
}

/// Build the loader for a backend
pub fn loader_for(kind: EmbedderKind) -> Arc<dyn ModelLoader> {
  match kind {
    EmbedderKind::Onnx => onnx_loader(),
    EmbedderKind::Hash => Arc::new(HashingModelLoader::default()),
  }
}

#[cfg(feature = "ml-features")]
fn onnx_loader() -> Arc<dyn ModelLoader> {
  Arc::new(onnx::OnnxModelLoader)
}

#[cfg(not(feature = "ml-features"))]
fn onnx_loader() -> Arc<dyn ModelLoader> {
  Arc::new(UnavailableModelLoader)
}

/// Stand-in when the crate is built without ML features
#[cfg(not(feature = "ml-features"))]
struct UnavailableModelLoader;

#[cfg(not(feature = "ml-features"))]
#[async_trait]
impl ModelLoader for UnavailableModelLoader {
  async fn load(&self, model_name: &str) -> Result<Box<dyn EmbeddingModel>> {
    Err(
      crate::error::CatalogError::model_load(
        model_name,
        "ML features not available; rebuild with --features ml-features or use --embedder hash",
      )
      .into(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_hash_loader_produces_working_model() -> Result<()> {
    let loader = loader_for(EmbedderKind::Hash);
    let mut model = loader.load("anything").await?;

    let embeddings = model.embed(&["Phone".to_string(), "Laptop".to_string()])?;

    assert_eq!(embeddings.len(), 2);
    assert_eq!(embeddings[0].len(), hashing::HASH_DIMENSIONS);
    Ok(())
  }

  #[test]
  fn test_default_backend_is_onnx() {
    assert_eq!(EmbedderKind::default(), EmbedderKind::Onnx);
  }
}
