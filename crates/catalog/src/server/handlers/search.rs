//! Search form and JSON search handlers

use axum::{
  extract::{Extension, Form, Json, State},
  response::{Html, Json as ResponseJson},
};

use crate::search::ERROR_MESSAGE;
use crate::server::{
  middleware::RequestContext,
  page,
  types::{SearchRequest, SearchResponse},
  AppState,
};

const COMPONENT: &str = "search-api";

/// GET / - Empty search form
pub async fn index() -> Html<String> {
  Html(page::render("", None))
}

/// POST / - Form submission, re-renders the page with the formatted results
pub async fn submit(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  Form(request): Form<SearchRequest>,
) -> Html<String> {
  let response = run_search(&state, &context, &request.query).await;
  Html(page::render(&request.query, Some(&response.output)))
}

/// POST /api/search - JSON search. Failures are reported in `output`, not as an HTTP error.
pub async fn api_search(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  Json(request): Json<SearchRequest>,
) -> ResponseJson<SearchResponse> {
  ResponseJson(run_search(&state, &context, &request.query).await)
}

async fn run_search(state: &AppState, context: &RequestContext, query: &str) -> SearchResponse {
  let response = state.search.search_or_message(query).await;

  if response.output == ERROR_MESSAGE {
    context.log_error("Search query failed", COMPONENT).await;
  } else {
    context.log_info(&format!("Search returned {} results", response.results.len()), COMPONENT).await;
  }

  response
}
