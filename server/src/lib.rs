use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderValue, StatusCode}, routing::get, Json, Router};
use search_core::persist;
use search_core::{query_with, InvertedIndex, QueryMode, SearchHit, SearchOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub legacy: bool,
}

#[derive(Deserialize)]
pub struct SearchBody {
    pub query: String,
    #[serde(default)]
    pub legacy: bool,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub empty_index: bool,
    pub results: Vec<SearchHit>,
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<InvertedIndex>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

/// Load the index file once and build the router over it.
pub fn build_app(index_file: &str) -> Result<Router> {
    let (index, report) = persist::load(index_file)?;
    tracing::info!(
        num_docs = index.doc_count(),
        num_terms = index.term_count(),
        format = %report.format,
        "index loaded"
    );
    Ok(router(AppState { index: Arc::new(index) }))
}

/// Browser access policy. `CORS_ALLOW_ORIGIN` holds a comma-separated
/// allow-list; when it is unset or has no parseable origin, any origin is
/// accepted.
pub fn cors_layer(allow_list: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = allow_list
        .into_iter()
        .flat_map(|list| list.split(','))
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    let policy = if origins.is_empty() { AllowOrigin::from(Any) } else { AllowOrigin::list(origins) };
    CorsLayer::new().allow_origin(policy).allow_methods(Any).allow_headers(Any)
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(std::env::var("CORS_ALLOW_ORIGIN").ok().as_deref());

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_get).post(search_post))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_get(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    run_search(&state, params.q, params.legacy)
}

pub async fn search_post(State(state): State<AppState>, Json(body): Json<SearchBody>) -> Result<Json<SearchResponse>, ApiError> {
    run_search(&state, body.query, body.legacy)
}

fn run_search(state: &AppState, query: String, legacy: bool) -> Result<Json<SearchResponse>, ApiError> {
    if query.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": "empty query" }))));
    }
    let start = std::time::Instant::now();
    let mode = if legacy { QueryMode::Legacy } else { QueryMode::Standard };
    let outcome = query_with(&state.index, &query, mode);
    let (empty_index, total_hits, results) = match outcome {
        SearchOutcome::EmptyIndex => (true, 0, Vec::new()),
        SearchOutcome::Ranked { hits, total_hits } => (false, total_hits, hits),
    };
    Ok(Json(SearchResponse { query, took_s: start.elapsed().as_secs_f64(), total_hits, empty_index, results }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<u32>) -> Result<Json<serde_json::Value>, ApiError> {
    if state.index.contains_document(doc_id) {
        return Ok(Json(serde_json::json!({ "docid": doc_id, "path": state.index.doc_path(doc_id) })));
    }
    Err((StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" }))))
}
