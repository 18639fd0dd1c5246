//! Offline embedding backend based on signed feature hashing
//!
//! Needs no download and no runtime, which makes it useful for air-gapped
//! runs and for exercising the pipeline in tests. Similarity is lexical, not
//! semantic.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::pooling::normalize;
use super::{Embedding, EmbeddingModel, ModelLoader};

/// Output dimension, matching the MiniLM family
pub const HASH_DIMENSIONS: usize = 384;

/// Loader for [`HashingEmbeddingModel`]; the model name is ignored
#[derive(Debug, Clone)]
pub struct HashingModelLoader {
  dimensions: usize,
}

impl HashingModelLoader {
  pub fn new(dimensions: usize) -> Self {
    Self { dimensions: dimensions.max(8) }
  }
}

impl Default for HashingModelLoader {
  fn default() -> Self {
    Self::new(HASH_DIMENSIONS)
  }
}

#[async_trait]
impl ModelLoader for HashingModelLoader {
  async fn load(&self, _model_name: &str) -> Result<Box<dyn EmbeddingModel>> {
    Ok(Box::new(HashingEmbeddingModel { dimensions: self.dimensions }))
  }
}

#[derive(Debug, Clone)]
pub struct HashingEmbeddingModel {
  dimensions: usize,
}

impl EmbeddingModel for HashingEmbeddingModel {
  fn embed(&mut self, texts: &[String]) -> Result<Vec<Embedding>> {
    Ok(texts.iter().map(|text| embed_text(text, self.dimensions)).collect())
  }
}

/// Hash every token into a signed, weighted bucket, then L2-normalise
pub fn embed_text(text: &str, dimensions: usize) -> Embedding {
  let mut vector = vec![0_f32; dimensions];

  for token in tokenize(text) {
    let hash = stable_hash(&token);
    let index = (hash as usize) % dimensions;
    let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
    let weight = 1.0 + (((hash >> 48) & 0xFF) as f32 / 255.0);
    vector[index] += sign * weight;
  }

  normalize(vector)
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
  text
    .split(|character: char| !character.is_alphanumeric())
    .filter(|token| !token.is_empty())
    .map(str::to_lowercase)
}

fn stable_hash(value: &str) -> u64 {
  let mut hasher = DefaultHasher::new();
  value.hash(&mut hasher);
  hasher.finish()
}
