use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use clir_core::config::MAX_TOP_K;
use clir_core::ingest::ingest_records;
use clir_core::language::{LanguageDetector, Passthrough, Translator};
use clir_core::persist::{load_index, prune_snapshots, save_index, IndexPaths};
use clir_core::source::parse_csv;
use clir_core::{DocId, QueryPipeline, ScoredResult, SearchConfig, SearchStatus};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub k: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub detected_language: String,
    pub translated: String,
    pub terms: Vec<String>,
    pub status: SearchStatus,
    pub took_ms: u128,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<ScoredResult>,
}

/// Detection and translation collaborators handed to every pipeline the server builds.
#[derive(Clone)]
pub struct Languages {
    pub detector: Arc<dyn LanguageDetector>,
    pub translator: Arc<dyn Translator>,
}

impl Languages {
    pub fn offline(config: &SearchConfig) -> Self {
        let p = Arc::new(Passthrough::new(config.corpus_language.clone()));
        Self { detector: p.clone(), translator: p }
    }
}

#[derive(Clone)]
pub struct AppState {
    /// Swapped wholesale on rebuild; handlers clone the inner Arc and drop the lock.
    pub pipeline: Arc<RwLock<Arc<QueryPipeline>>>,
    pub index_paths_root: PathBuf,
    pub admin_token: Option<String>,
    /// Held across build, save and swap so uploads apply one at a time.
    rebuild: Arc<Mutex<()>>,
}

impl AppState {
    /// Load the persisted snapshot and wrap it in a pipeline.
    pub fn load(index_dir: &str, config: SearchConfig, languages: Languages, admin_token: Option<String>) -> Result<Self> {
        let index = load_index(&IndexPaths::new(index_dir))?;
        tracing::info!(index_dir, num_docs = index.len(), "index loaded");
        let pipeline = QueryPipeline::new(Arc::new(index), languages.detector, languages.translator, config);
        Ok(Self {
            pipeline: Arc::new(RwLock::new(Arc::new(pipeline))),
            index_paths_root: PathBuf::from(index_dir),
            admin_token,
            rebuild: Arc::new(Mutex::new(())),
        })
    }

    fn current(&self) -> Arc<QueryPipeline> {
        self.pipeline.read().clone()
    }
}

pub fn build_app(index_dir: String, config: SearchConfig, languages: Languages) -> Result<Router> {
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let app_state = AppState::load(&index_dir, config, languages, admin_token)?;
    Ok(router(app_state))
}

pub fn router(app_state: AppState) -> Router {
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
        .route("/doc/:doc_id", get(doc_handler))
        .route("/index/upload", post(upload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let pipeline = state.current();
    let k = params.k.unwrap_or(pipeline.config().top_k).clamp(1, MAX_TOP_K);
    let resp = pipeline.search_top(&params.q, k).await;
    let elapsed = start.elapsed();
    tracing::debug!(q = %params.q, status = ?resp.status, hits = resp.total_hits, "search");
    Json(SearchResponse {
        query: resp.query.raw,
        detected_language: resp.query.detected_language,
        translated: resp.query.translated,
        terms: resp.query.terms,
        status: resp.status,
        took_ms: elapsed.as_millis(),
        took_s: elapsed.as_secs_f64(),
        total_hits: resp.total_hits,
        results: resp.results,
    })
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> (StatusCode, Json<serde_json::Value>) {
    let pipeline = state.current();
    match pipeline.index().document(doc_id) {
        Some(doc) => (StatusCode::OK, Json(serde_json::json!({
            "doc_id": doc.id,
            "title": doc.title,
            "content": doc.content,
        }))),
        None => (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" }))),
    }
}

/// Rebuild from an uploaded CSV body. The old snapshot keeps serving until the
/// new one is built and saved; concurrent uploads queue on `rebuild`.
async fn upload_handler(State(state): State<AppState>, headers: axum::http::HeaderMap, body: String) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let _guard = state.rebuild.lock().await;
    let current = state.current();
    let config = current.config().clone();
    let analyzer = current.index().analyzer();
    let root = state.index_paths_root.clone();

    let index = tokio::task::spawn_blocking(move || {
        let records = parse_csv(body.as_bytes(), "upload").map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        let index = ingest_records(records, &config, analyzer).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        let paths = IndexPaths::new(&root);
        save_index(&paths, &index).map_err(|e| {
            tracing::error!(error = %e, "failed to persist uploaded index");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("failed to persist index: {e}"))
        })?;
        if let Err(e) = prune_snapshots(&paths) {
            tracing::warn!(error = %e, "failed to prune old snapshots");
        }
        Ok::<_, (StatusCode, String)>(index)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("rebuild task failed: {e}")))??;

    let num_docs = index.len();
    let next = Arc::new(current.with_index(Arc::new(index)));
    *state.pipeline.write() = next;
    tracing::info!(num_docs, "index rebuilt from upload");
    Ok(Json(serde_json::json!({ "num_docs": num_docs })))
}

fn authorize(state: &AppState, headers: &axum::http::HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
