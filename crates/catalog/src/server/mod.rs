//! Web front end
//!
//! A single-form search page plus a small JSON API, served with axum. Every
//! query goes through [`SearchService::search_or_message`], so a failing
//! query shows the fixed error text instead of failing the request.

pub mod handlers;
pub mod middleware;
pub mod page;
pub mod request_log;
pub mod routing;
pub mod server;
pub mod types;

pub use request_log::RequestLog;
pub use routing::create_router;
pub use server::{start_server, ServeOptions};

use std::sync::Arc;

use crate::search::SearchService;

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
  pub search: Arc<SearchService>,
  pub request_log: RequestLog,
}

impl AppState {
  pub fn new(search: SearchService, request_log: RequestLog) -> Self {
    Self { search: Arc::new(search), request_log }
  }
}
