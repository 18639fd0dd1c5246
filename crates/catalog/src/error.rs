//! Error taxonomy for the ingestion and query pipelines
//!
//! Every external boundary (file read, model load, model encode, vector store
//! request) reports failures as a `CatalogError` wrapped in `anyhow::Error`, so
//! callers can `downcast_ref` to tell the failure kinds apart.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
  #[error("Failed to read '{path}': {message}")]
  Io { path: String, message: String },

  #[error("Failed to parse '{path}': {message}")]
  Parse { path: String, message: String },

  #[error("Failed to load embedding model '{model}': {message}")]
  ModelLoad { model: String, message: String },

  #[error("Failed to encode {count} text(s) with '{model}': {message}")]
  Encoding { model: String, count: usize, message: String },

  #[error("Failed to connect to vector store at {url}: {message}")]
  Connection { url: String, message: String },

  #[error("Vector store request failed: {message}")]
  Store { message: String },

  #[error("Cannot infer vector dimension for collection '{collection}' from an empty embedding batch")]
  EmptyBatch { collection: String },

  #[error("Mismatched batch for collection '{collection}': {message}")]
  MismatchedBatch { collection: String, message: String },
}

impl CatalogError {
  pub fn io(path: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Io { path: path.into(), message: message.into() }
  }

  pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Parse { path: path.into(), message: message.into() }
  }

  pub fn model_load(model: impl Into<String>, message: impl Into<String>) -> Self {
    Self::ModelLoad { model: model.into(), message: message.into() }
  }

  pub fn encoding(model: impl Into<String>, count: usize, message: impl Into<String>) -> Self {
    Self::Encoding { model: model.into(), count, message: message.into() }
  }

  pub fn connection(url: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Connection { url: url.into(), message: message.into() }
  }

  pub fn store(message: impl Into<String>) -> Self {
    Self::Store { message: message.into() }
  }

  pub fn empty_batch(collection: impl Into<String>) -> Self {
    Self::EmptyBatch { collection: collection.into() }
  }

  pub fn mismatched_batch(collection: impl Into<String>, message: impl Into<String>) -> Self {
    Self::MismatchedBatch { collection: collection.into(), message: message.into() }
  }
}
