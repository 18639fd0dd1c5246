//! Request context middleware
//!
//! Every request gets a [`RequestContext`] in its extensions, and its start
//! and completion are written to tracing and to the request log.

use axum::{
  extract::{Request, State},
  http::{Method, Uri},
  middleware::Next,
  response::Response,
};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use super::request_log::{LogContext, RequestLog};
use super::AppState;

const COMPONENT: &str = "http-request";

#[derive(Clone)]
pub struct RequestContext {
  pub request_id: Uuid,
  pub method: Method,
  pub uri: Uri,
  pub request_log: RequestLog,
}

impl RequestContext {
  pub fn new(method: Method, uri: Uri, request_log: RequestLog) -> Self {
    Self { request_id: Uuid::new_v4(), method, uri, request_log }
  }

  pub async fn log_info(&self, message: &str, component: &str) {
    self.log_with_context(message, "info", component, None, None).await;
  }

  pub async fn log_error(&self, message: &str, component: &str) {
    self.log_with_context(message, "error", component, None, None).await;
  }

  pub async fn log_with_context(
    &self,
    message: &str,
    level: &str,
    component: &str,
    status_code: Option<u16>,
    duration_ms: Option<f64>,
  ) {
    let context = LogContext {
      request_id: Some(self.request_id.to_string()),
      method: Some(self.method.to_string()),
      path: Some(self.uri.path().to_string()),
      status_code,
      duration_ms,
    };
    self.request_log.log(level, message, component, Some(context)).await;
  }
}

/// Attach a [`RequestContext`] and log the request around the handler
pub async fn request_context_middleware(
  State(state): State<AppState>,
  mut request: Request,
  next: Next,
) -> Response {
  let context =
    RequestContext::new(request.method().clone(), request.uri().clone(), state.request_log.clone());

  let start = Instant::now();
  context.log_with_context("Request started", "info", COMPONENT, None, None).await;
  request.extensions_mut().insert(context.clone());

  let response = next.run(request).await;

  let status = response.status();
  let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
  let level = if status.is_server_error() { "error" } else { "info" };
  context
    .log_with_context("Request completed", level, COMPONENT, Some(status.as_u16()), Some(duration_ms))
    .await;

  let path = context.uri.path();
  if status.is_server_error() {
    warn!(request_id = %context.request_id, method = %context.method, path, status = status.as_u16(), duration_ms, "Request failed");
  } else {
    info!(request_id = %context.request_id, method = %context.method, path, status = status.as_u16(), duration_ms, "Request completed");
  }

  response
}
