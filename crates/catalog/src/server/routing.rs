//! Axum router configuration for all endpoints

use axum::{
  middleware::from_fn_with_state,
  routing::{get, post},
  Router,
};

use super::handlers::{logs, search, status};
use super::middleware::request_context_middleware;
use super::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
  Router::new()
    // Search page and JSON search
    .route("/", get(search::index).post(search::submit))
    .route("/api/search", post(search::api_search))
    // Status and logs
    .route("/status", get(status::status))
    .route("/logs", get(logs::get_logs))
    .layer(from_fn_with_state(state.clone(), request_context_middleware))
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::embeddings::{HashingModelLoader, ModelCache};
  use crate::records::Document;
  use crate::search::{SearchOutput, SearchService, ERROR_MESSAGE};
  use crate::server::types::{LogsResponse, StatusResponse};
  use crate::server::RequestLog;
  use crate::store::{self, MemoryStore, VectorStore};
  use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
  };
  use serde::de::DeserializeOwned;
  use std::sync::Arc;
  use tempfile::TempDir;
  use tower::ServiceExt;

  const COLLECTION: &str = "Device_info_db";

  async fn app(dir: &TempDir, indexed: bool) -> Router {
    let cache = Arc::new(ModelCache::new(Arc::new(HashingModelLoader::default())));
    let store = Arc::new(MemoryStore::new());

    if indexed {
      let texts = vec![
        "Description: Phone\nPrice: 100\n\n".to_string(),
        "Description: Laptop\nPrice: 500\n\n".to_string(),
      ];
      let embeddings = cache.embed(&texts, "hash").await.unwrap();
      let documents: Vec<Document> = texts.into_iter().map(Document::from).collect();
      store::replace_and_upload(store.as_ref(), COLLECTION, &embeddings, &documents).await.unwrap();
    }

    let store: Arc<dyn VectorStore> = store;
    let search = SearchService::new(cache, store, "hash", COLLECTION);
    let request_log = RequestLog::new(dir.path().join("server.logs.jsonl")).unwrap();
    create_router(AppState::new(search, request_log))
  }

  async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
  }

  async fn body_json<T: DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn json_search(query: &str) -> Request<Body> {
    Request::post("/api/search")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(serde_json::json!({ "query": query }).to_string()))
      .unwrap()
  }

  #[tokio::test]
  async fn test_index_serves_form() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir, false).await.oneshot(Request::get("/").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("Semantic Search"));
    assert!(page.contains(r#"name="query""#));
  }

  #[tokio::test]
  async fn test_form_submission_renders_results() {
    let dir = TempDir::new().unwrap();
    let request = Request::post("/")
      .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
      .body(Body::from("query=Phone"))
      .unwrap();

    let response = app(&dir, true).await.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("<pre id=\"output\">ID: "));
    assert!(page.contains("Text: Description: Phone"));
  }

  #[tokio::test]
  async fn test_api_search_returns_ranked_results() {
    let dir = TempDir::new().unwrap();

    let response = app(&dir, true).await.oneshot(json_search("Phone")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: SearchOutput = body_json(response).await;
    assert_eq!(body.results.len(), 2);
    assert!(body.results[0].text.contains("Phone"));
    assert!(body.output.starts_with("ID: "));
  }

  #[tokio::test]
  async fn test_api_search_failure_is_still_ok() {
    let dir = TempDir::new().unwrap();

    let response = app(&dir, false).await.oneshot(json_search("Phone")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: SearchOutput = body_json(response).await;
    assert_eq!(body.output, ERROR_MESSAGE);
    assert!(body.results.is_empty());
  }

  #[tokio::test]
  async fn test_status_reports_collection() {
    let dir = TempDir::new().unwrap();

    let response =
      app(&dir, true).await.oneshot(Request::get("/status").body(Body::empty()).unwrap()).await.unwrap();

    let body: StatusResponse = body_json(response).await;
    assert_eq!(body.collection, COLLECTION);
    assert_eq!(body.model_name, "hash");
    assert_eq!(body.points, Some(2));
    assert_eq!(body.limit, 5);
  }

  #[tokio::test]
  async fn test_status_points_null_without_collection() {
    let dir = TempDir::new().unwrap();

    let response =
      app(&dir, false).await.oneshot(Request::get("/status").body(Body::empty()).unwrap()).await.unwrap();

    let body: StatusResponse = body_json(response).await;
    assert_eq!(body.points, None);
  }

  #[tokio::test]
  async fn test_requests_are_logged() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, true).await;

    app.clone().oneshot(json_search("Phone")).await.unwrap();
    let response = app.oneshot(Request::get("/logs?limit=50").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: LogsResponse = body_json(response).await;
    let completed = body
      .logs
      .iter()
      .filter_map(|entry| entry.context.as_ref().filter(|_| entry.message == "Request completed"))
      .find(|context| context.path.as_deref() == Some("/api/search"))
      .expect("search request should be logged");
    assert_eq!(completed.status_code, Some(200));
    assert!(body.logs.iter().any(|entry| entry.message == "Search returned 2 results"));
  }

  #[tokio::test]
  async fn test_logs_level_filter() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir, false).await;

    app.clone().oneshot(json_search("Phone")).await.unwrap();
    let response =
      app.oneshot(Request::get("/logs?level=error").body(Body::empty()).unwrap()).await.unwrap();

    let body: LogsResponse = body_json(response).await;
    assert!(!body.logs.is_empty());
    assert!(body.logs.iter().all(|entry| entry.level == "error"));
  }
}
