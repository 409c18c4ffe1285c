use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::get, Json, Router};
use search_core::boolean::sorted_ids;
use search_core::{DocId, EngineConfig, SearchEngine, SearchHit, DEFAULT_TOP_N};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub k: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct BooleanResponse {
    pub query: String,
    pub total_hits: usize,
    pub ids: Vec<DocId>,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(ErrorBody { error: msg.into() }))
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub default_k: usize,
    pub query_timeout: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self { Self { default_k: DEFAULT_TOP_N, query_timeout: Duration::from_millis(2000) } }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub settings: ServerSettings,
}

/// Loads the engine (blocking) and builds the router. Load failure is fatal to the caller.
pub fn build_app(config: &EngineConfig, settings: ServerSettings) -> Result<Router> {
    let engine = SearchEngine::load(config)?;
    tracing::info!(num_docs = engine.num_documents(), num_terms = engine.index().len(), "search engine loaded");
    Ok(router(Arc::new(engine), settings))
}

pub fn router(engine: Arc<SearchEngine>, settings: ServerSettings) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/boolean", get(boolean_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(AppState { engine, settings })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Runs `f` on the blocking pool; exceeding the timeout is an error, not an empty result.
async fn run_query<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&SearchEngine) -> T + Send + 'static,
{
    let engine = state.engine.clone();
    let task = tokio::task::spawn_blocking(move || f(&engine));
    match tokio::time::timeout(state.settings.query_timeout, task).await {
        Ok(Ok(out)) => Ok(out),
        Ok(Err(err)) => {
            tracing::error!(%err, "query task failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "query failed"))
        }
        Err(_) => {
            tracing::warn!(timeout_ms = state.settings.query_timeout.as_millis() as u64, "query timed out");
            Err(api_error(StatusCode::GATEWAY_TIMEOUT, "query timed out"))
        }
    }
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = Instant::now();
    let k = params.k.unwrap_or(state.settings.default_k).clamp(1, MAX_K);
    let q = params.q.clone();
    let (total_hits, results) = run_query(&state, move |engine| engine.search_counted(&q, k)).await?;
    Ok(Json(SearchResponse { query: params.q, took_s: start.elapsed().as_secs_f64(), total_hits, results }))
}

pub async fn boolean_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<BooleanResponse>, ApiError> {
    let q = params.q.clone();
    let result = run_query(&state, move |engine| engine.boolean(&q)).await?;
    match result {
        Ok(set) => {
            let ids = sorted_ids(&set);
            Ok(Json(BooleanResponse { query: params.q, total_hits: ids.len(), ids }))
        }
        Err(err) => Err(api_error(StatusCode::BAD_REQUEST, format!("invalid query: {err}"))),
    }
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<serde_json::Value>, ApiError> {
    let doc = state.engine.document(doc_id).ok_or_else(|| api_error(StatusCode::NOT_FOUND, "not found"))?;
    Ok(Json(serde_json::json!({
        "id": doc.id,
        "title": doc.title,
        "text": doc.text,
    })))
}
