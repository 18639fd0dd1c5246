//! Sentence-transformers models run through ONNX Runtime

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use hf_hub::api::tokio::{Api, ApiRepo};
use ndarray::Array2;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokenizers::{Encoding, PaddingParams, Tokenizer, TruncationParams};
use tracing::{debug, info};

use ort::{
  execution_providers::{CPUExecutionProvider, ExecutionProviderDispatch},
  session::Session,
  value::Value,
};

#[cfg(target_os = "linux")]
use ort::execution_providers::CUDAExecutionProvider;

#[cfg(target_os = "macos")]
use ort::execution_providers::CoreMLExecutionProvider;

use super::pooling::{mean_pool, normalize};
use super::{Embedding, EmbeddingModel, ModelLoader};
use crate::error::CatalogError;

const TOKENIZER_FILE: &str = "tokenizer.json";
const MODEL_FILES: [&str; 2] = ["onnx/model.onnx", "model.onnx"];
const MAX_SEQUENCE_LENGTH: usize = 512;
const BATCH_SIZE: usize = 32;

/// Loads `model_name` from a local directory or the Hugging Face hub
pub struct OnnxModelLoader;

#[async_trait]
impl ModelLoader for OnnxModelLoader {
  async fn load(&self, model_name: &str) -> Result<Box<dyn EmbeddingModel>> {
    Ok(Box::new(OnnxEmbeddingModel::load(model_name).await?))
  }
}

pub struct OnnxEmbeddingModel {
  session: Session,
  tokenizer: Tokenizer,
  input_names: Vec<String>,
}

struct ModelFiles {
  tokenizer_file: PathBuf,
  model_path: PathBuf,
}

// Model initialization
#[cfg(not(tarpaulin_include))]
impl OnnxEmbeddingModel {
  pub async fn load(model_name: &str) -> Result<Self> {
    let files = Self::resolve_model_files(model_name).await?;
    let tokenizer = Self::load_tokenizer(model_name, &files.tokenizer_file)?;
    let session = Self::load_session(model_name, &files.model_path)?;
    let input_names = session.inputs.iter().map(|input| input.name.to_string()).collect();

    info!(model = model_name, path = %files.model_path.display(), "ONNX session created");
    Ok(Self { session, tokenizer, input_names })
  }

  async fn resolve_model_files(model_name: &str) -> Result<ModelFiles> {
    let local = Path::new(model_name);
    if local.is_dir() {
      return Self::local_model_files(model_name, local);
    }

    let api = Api::new().map_err(|e| {
      CatalogError::model_load(model_name, format!("HF API initialization failed: {e}"))
    })?;
    let repo = api.model(model_name.to_string());

    let tokenizer_file = repo
      .get(TOKENIZER_FILE)
      .await
      .map_err(|e| CatalogError::model_load(model_name, format!("Failed to download tokenizer: {e}")))?;
    let model_path = Self::download_onnx_file(model_name, &repo).await?;

    Ok(ModelFiles { tokenizer_file, model_path })
  }

  async fn download_onnx_file(model_name: &str, repo: &ApiRepo) -> Result<PathBuf> {
    let mut failures = Vec::new();
    for file in MODEL_FILES {
      match repo.get(file).await {
        Ok(path) => return Ok(path),
        Err(e) => {
          debug!(model = model_name, file, error = %e, "ONNX export not found at path");
          failures.push(format!("{file}: {e}"));
        }
      }
    }

    Err(
      CatalogError::model_load(
        model_name,
        format!("no ONNX export found ({})", failures.join("; ")),
      )
      .into(),
    )
  }

  fn local_model_files(model_name: &str, dir: &Path) -> Result<ModelFiles> {
    let tokenizer_file = dir.join(TOKENIZER_FILE);
    let model_path = MODEL_FILES
      .iter()
      .map(|file| dir.join(file))
      .find(|path| path.exists())
      .ok_or_else(|| CatalogError::model_load(model_name, "no ONNX export in model directory"))?;

    if !tokenizer_file.exists() {
      return Err(CatalogError::model_load(model_name, "no tokenizer.json in model directory").into());
    }

    Ok(ModelFiles { tokenizer_file, model_path })
  }

  fn load_tokenizer(model_name: &str, path: &Path) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path)
      .map_err(|e| CatalogError::model_load(model_name, format!("Failed to load tokenizer: {e}")))?;

    tokenizer.with_padding(Some(PaddingParams::default()));
    tokenizer
      .with_truncation(Some(TruncationParams {
        max_length: MAX_SEQUENCE_LENGTH,
        ..Default::default()
      }))
      .map_err(|e| CatalogError::model_load(model_name, format!("Failed to configure truncation: {e}")))?;

    Ok(tokenizer)
  }

  fn load_session(model_name: &str, model_path: &Path) -> Result<Session> {
    let providers = Self::get_execution_providers();

    Session::builder()
      .and_then(|builder| builder.with_execution_providers(providers))
      .and_then(|builder| builder.commit_from_file(model_path))
      .map_err(|e| CatalogError::model_load(model_name, format!("Failed to create ONNX session: {e}")).into())
  }
}

// Hardware detection
#[cfg(not(tarpaulin_include))]
impl OnnxEmbeddingModel {
  fn get_execution_providers() -> Vec<ExecutionProviderDispatch> {
    let mut providers = Vec::new();

    #[cfg(target_os = "macos")]
    {
      providers.push(CoreMLExecutionProvider::default().into());
    }

    #[cfg(target_os = "linux")]
    {
      if Self::is_cuda_available() {
        providers.push(CUDAExecutionProvider::default().build());
      }
    }

    providers.push(CPUExecutionProvider::default().into());
    providers
  }

  #[cfg(target_os = "linux")]
  fn is_cuda_available() -> bool {
    std::process::Command::new("nvidia-smi")
      .output()
      .map(|output| output.status.success())
      .unwrap_or(false)
  }
}

// Encoding
impl OnnxEmbeddingModel {
  fn embed_chunk(&mut self, texts: &[String]) -> Result<Vec<Embedding>> {
    let encodings = self
      .tokenizer
      .encode_batch(texts.to_vec(), true)
      .map_err(|e| anyhow!("Tokenization failed: {e}"))?;

    let batch = TokenBatch::from_encodings(&encodings);
    let inputs = batch.to_inputs(&self.input_names)?;

    let outputs = self.session.run(inputs)?;
    let tensor = outputs
      .get("last_hidden_state")
      .or_else(|| outputs.get("token_embeddings"))
      .ok_or_else(|| anyhow!("No output found from model - expected 'last_hidden_state'"))?;

    let (shape, data) = tensor.try_extract_tensor::<f32>()?;
    let pooled = mean_pool(shape.as_ref(), data, &batch.attention_mask)?;

    Ok(pooled.into_iter().map(normalize).collect())
  }
}

impl EmbeddingModel for OnnxEmbeddingModel {
  fn embed(&mut self, texts: &[String]) -> Result<Vec<Embedding>> {
    let mut embeddings = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(BATCH_SIZE) {
      embeddings.extend(self.embed_chunk(chunk)?);
    }
    Ok(embeddings)
  }
}

/// Padded token ids for one batch, row-major `[rows, seq_len]`
struct TokenBatch {
  rows: usize,
  seq_len: usize,
  input_ids: Vec<i64>,
  attention_mask: Vec<i64>,
  type_ids: Vec<i64>,
}

impl TokenBatch {
  fn from_encodings(encodings: &[Encoding]) -> Self {
    let rows: Vec<(&[u32], &[u32], &[u32])> = encodings
      .iter()
      .map(|encoding| (encoding.get_ids(), encoding.get_attention_mask(), encoding.get_type_ids()))
      .collect();
    Self::from_rows(&rows)
  }

  /// Rows shorter than the longest one are padded with zeros
  fn from_rows(rows: &[(&[u32], &[u32], &[u32])]) -> Self {
    let seq_len = rows.iter().map(|(ids, _, _)| ids.len()).max().unwrap_or(0);
    let mut batch = Self {
      rows: rows.len(),
      seq_len,
      input_ids: Vec::with_capacity(rows.len() * seq_len),
      attention_mask: Vec::with_capacity(rows.len() * seq_len),
      type_ids: Vec::with_capacity(rows.len() * seq_len),
    };

    for (ids, mask, type_ids) in rows {
      pad_into(&mut batch.input_ids, ids, seq_len);
      pad_into(&mut batch.attention_mask, mask, seq_len);
      pad_into(&mut batch.type_ids, type_ids, seq_len);
    }
    batch
  }

  fn to_inputs(&self, input_names: &[String]) -> Result<HashMap<String, Value>> {
    let mut inputs = HashMap::new();
    inputs.insert("input_ids".to_string(), self.to_tensor(&self.input_ids)?);
    inputs.insert("attention_mask".to_string(), self.to_tensor(&self.attention_mask)?);

    if input_names.iter().any(|name| name == "token_type_ids") {
      inputs.insert("token_type_ids".to_string(), self.to_tensor(&self.type_ids)?);
    }

    Ok(inputs)
  }

  fn to_tensor(&self, values: &[i64]) -> Result<Value> {
    let array: Array2<i64> = Array2::from_shape_vec((self.rows, self.seq_len), values.to_vec())?;
    let tensor: Value = Value::from_array(array)?.into();
    Ok(tensor)
  }
}

fn pad_into(target: &mut Vec<i64>, values: &[u32], seq_len: usize) {
  target.extend(values.iter().map(|&value| i64::from(value)));
  target.extend(std::iter::repeat(0).take(seq_len.saturating_sub(values.len())));
}
