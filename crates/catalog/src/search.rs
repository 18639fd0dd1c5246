//! Query pipeline: embed the query, search the collection, format the hits

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, error};

use crate::config::DEFAULT_TOP_K;
use crate::embeddings::ModelCache;
use crate::error::CatalogError;
use crate::store::{self, SearchResult, VectorStore};

/// Text shown to the user in place of results when a query fails
pub const ERROR_MESSAGE: &str = "An error occurred while processing the search query.";

/// What the front end shows for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchOutput {
  /// Formatted result lines, or the fixed error message
  pub output: String,
  /// Ranked hits; empty on failure
  pub results: Vec<SearchResult>,
}

/// Embed `query` with `model_name` and return up to `k` hits from `collection`
pub async fn search_query(
  query: &str,
  model_name: &str,
  cache: &ModelCache,
  store: &dyn VectorStore,
  collection: &str,
  k: usize,
) -> Result<Vec<SearchResult>> {
  let mut embeddings = cache.embed(&[query.to_string()], model_name).await?;
  let query_embedding = embeddings
    .pop()
    .ok_or_else(|| CatalogError::encoding(model_name, 1, "model returned no embedding for the query"))?;

  let results = store::search(store, collection, &query_embedding, k).await?;
  debug!(collection, hits = results.len(), "Search completed");
  Ok(results)
}

/// One `ID: <id>, Score: <score>, Text: <text>` line per hit
pub fn format_results(results: &[SearchResult]) -> String {
  results.iter().fold(String::new(), |mut output, result| {
    let score = format_score(result.score);
    let _ = writeln!(output, "ID: {}, Score: {}, Text: {}", result.id, score, result.text);
    output
  })
}

/// Shortest round-trip form with a `.0` on whole numbers and a signed two-digit
/// exponent outside `[1e-4, 1e16)`, e.g. `1.0`, `0.875`, `1e-05`
pub fn format_score(score: f32) -> String {
  if !score.is_finite() {
    return score.to_string();
  }

  let magnitude = score.abs();
  if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
    let scientific = format!("{score:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
      return scientific;
    };
    let (sign, digits) = exponent.strip_prefix('-').map_or(("+", exponent), |digits| ("-", digits));
    return format!("{mantissa}e{sign}{digits:0>2}");
  }

  let plain = score.to_string();
  if plain.contains('.') {
    plain
  } else {
    format!("{plain}.0")
  }
}

/// Everything a query needs, shared by the web front end and the `search` command
pub struct SearchService {
  cache: Arc<ModelCache>,
  store: Arc<dyn VectorStore>,
  model_name: String,
  collection: String,
  limit: usize,
}

impl SearchService {
  pub fn new(
    cache: Arc<ModelCache>,
    store: Arc<dyn VectorStore>,
    model_name: impl Into<String>,
    collection: impl Into<String>,
  ) -> Self {
    Self { cache, store, model_name: model_name.into(), collection: collection.into(), limit: DEFAULT_TOP_K }
  }

  pub fn with_limit(mut self, limit: usize) -> Self {
    self.limit = limit;
    self
  }

  pub fn model_name(&self) -> &str {
    &self.model_name
  }

  pub fn collection(&self) -> &str {
    &self.collection
  }

  pub fn limit(&self) -> usize {
    self.limit
  }

  /// Load the query model ahead of the first request
  pub async fn warm_up(&self) -> Result<()> {
    self.cache.model(&self.model_name).await?;
    Ok(())
  }

  pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
    search_query(query, &self.model_name, &self.cache, self.store.as_ref(), &self.collection, self.limit).await
  }

  /// Run the query and format it. Failures become [`ERROR_MESSAGE`].
  pub async fn search_or_message(&self, query: &str) -> SearchOutput {
    match self.search(query).await {
      Ok(results) => SearchOutput { output: format_results(&results), results },
      Err(e) => {
        error!(query, error = %e, "Search query failed");
        SearchOutput { output: ERROR_MESSAGE.to_string(), results: Vec::new() }
      }
    }
  }

  pub async fn loaded_models(&self) -> Vec<String> {
    self.cache.loaded_models().await
  }

  /// Points in the collection, or `None` when the store cannot say
  pub async fn point_count(&self) -> Option<usize> {
    match self.store.count_points(&self.collection).await {
      Ok(count) => Some(count),
      Err(e) => {
        debug!(collection = %self.collection, error = %e, "Point count unavailable");
        None
      }
    }
  }
}
