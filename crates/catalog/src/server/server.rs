//! Web server startup and configuration

use anyhow::{anyhow, Result};
use axum::serve;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use super::{create_router, AppState, RequestLog};
use crate::config::get_server_logs_path;
use crate::embeddings::ModelCache;
use crate::search::SearchService;
use crate::store::{self, VectorStore};

const COMPONENT: &str = "catalog-server";

/// Settings for `catalog serve`
#[derive(Debug, Clone)]
pub struct ServeOptions {
  pub bind: SocketAddr,
  pub qdrant_url: String,
  pub model_name: String,
  pub collection: String,
  pub limit: usize,
}

/// Connect the store, warm the model and build the handler state
pub async fn build_state(options: &ServeOptions, cache: Arc<ModelCache>) -> Result<AppState> {
  let store: Arc<dyn VectorStore> = Arc::new(store::initialize(&options.qdrant_url).await?);

  let search = SearchService::new(cache, store, &options.model_name, &options.collection)
    .with_limit(options.limit);
  search.warm_up().await?;

  let request_log = RequestLog::new(get_server_logs_path()?)?;
  Ok(AppState::new(search, request_log))
}

/// Start the web server and run until interrupted
pub async fn start_server(options: ServeOptions, cache: Arc<ModelCache>) -> Result<()> {
  let state = build_state(&options, cache).await?;
  let request_log = state.request_log.clone();

  let addr = options.bind;
  info!(%addr, model = %options.model_name, collection = %options.collection, "Starting search server");
  request_log.log("info", &format!("Starting search server on {addr}"), COMPONENT, None).await;

  let app = create_router(state)
    .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()));

  let listener = TcpListener::bind(addr).await?;
  info!(%addr, "Server listening");
  request_log.log("info", &format!("Server listening on {addr}"), COMPONENT, None).await;

  match serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
    Ok(()) => {
      request_log.log("info", "Server shutdown gracefully", COMPONENT, None).await;
      info!("Server shutdown gracefully");
      Ok(())
    }
    Err(e) => {
      request_log.log("error", &format!("Server error: {e}"), COMPONENT, None).await;
      error!(error = %e, "Server error");
      Err(anyhow!("Server error: {e}"))
    }
  }
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::CATALOG_ROOT_ENV;
  use crate::embeddings::{EmbeddingModel, HashingModelLoader, ModelLoader};
  use crate::error::CatalogError;
  use async_trait::async_trait;
  use mockito::Server;
  use serial_test::serial;
  use std::env;

  fn options(qdrant_url: &str, model_name: &str) -> ServeOptions {
    ServeOptions {
      bind: "127.0.0.1:0".parse().unwrap(),
      qdrant_url: qdrant_url.to_string(),
      model_name: model_name.to_string(),
      collection: "Device_info_db".to_string(),
      limit: 3,
    }
  }

  fn hashing_cache() -> Arc<ModelCache> {
    Arc::new(ModelCache::new(Arc::new(HashingModelLoader::default())))
  }

  async fn qdrant() -> mockito::ServerGuard {
    let mut server = Server::new_async().await;
    server
      .mock("GET", "/")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{"title":"qdrant - vector search engine","version":"1.9.0"}"#)
      .create_async()
      .await;
    server
  }

  struct MissingModelLoader;

  #[async_trait]
  impl ModelLoader for MissingModelLoader {
    async fn load(&self, model_name: &str) -> Result<Box<dyn EmbeddingModel>> {
      Err(anyhow!("no such model: {model_name}"))
    }
  }

  #[tokio::test]
  #[serial]
  async fn test_build_state_connects_and_warms_model() -> Result<()> {
    let root = tempfile::TempDir::new()?;
    env::set_var(CATALOG_ROOT_ENV, root.path());
    let server = qdrant().await;
    let cache = hashing_cache();

    let state = build_state(&options(&server.url(), "hash"), cache.clone()).await;
    env::remove_var(CATALOG_ROOT_ENV);
    let state = state?;

    assert_eq!(cache.loaded_models().await, vec!["hash".to_string()]);
    assert_eq!(state.search.model_name(), "hash");
    assert_eq!(state.request_log.path().await, root.path().join("server.logs.jsonl"));
    Ok(())
  }

  #[tokio::test]
  #[serial]
  async fn test_build_state_fails_when_store_unreachable() -> Result<()> {
    let root = tempfile::TempDir::new()?;
    env::set_var(CATALOG_ROOT_ENV, root.path());
    let cache = hashing_cache();

    let result = build_state(&options("http://127.0.0.1:1", "hash"), cache.clone()).await;
    env::remove_var(CATALOG_ROOT_ENV);

    let error = result.err().expect("unreachable store should fail startup");
    assert!(matches!(error.downcast_ref::<CatalogError>(), Some(CatalogError::Connection { .. })));
    assert!(cache.loaded_models().await.is_empty());
    Ok(())
  }

  #[tokio::test]
  #[serial]
  async fn test_build_state_fails_when_model_cannot_load() -> Result<()> {
    let root = tempfile::TempDir::new()?;
    env::set_var(CATALOG_ROOT_ENV, root.path());
    let server = qdrant().await;
    let cache = Arc::new(ModelCache::new(Arc::new(MissingModelLoader)));

    let result = build_state(&options(&server.url(), "missing/model"), cache).await;
    env::remove_var(CATALOG_ROOT_ENV);

    let error = result.err().expect("missing model should fail startup");
    assert!(matches!(error.downcast_ref::<CatalogError>(), Some(CatalogError::ModelLoad { .. })));
    Ok(())
  }
}
