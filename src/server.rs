//! Governance HTTP API.
//!
//! Exposes ingestion and retrieval over JSON HTTP for dashboards and
//! agent tooling.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/governance` | Ingest a document version (chunk + tag + embed + replace) |
//! | `POST` | `/governance/search` | Hybrid search; response reports the serving mode |
//! | `GET`  | `/governance/sections` | Chunk metadata with embedding flags (`?version=` optional) |
//! | `GET`  | `/governance/version` | Latest version label, timestamp, and counts |
//! | `GET`  | `/health` | Health check (returns crate version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query is required" } }
//! ```
//!
//! Error codes: `bad_request` (400, validation), `not_found` (404),
//! `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser dashboards
//! can call the API directly.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::{Config, EmbeddingSettings};
use crate::db;
use crate::embedding::{EmbeddingProvider, ProviderResolver};
use crate::error::ValidationError;
use crate::ingest::ingest_document;
use crate::models::{SearchMode, SearchResultItem, SectionInfo};
use crate::search::search_chunks;
use crate::store::sqlite::SqliteStore;
use crate::store::ChunkStore;

/// Shared state for all route handlers. The provider is resolved through
/// a memoized resolver: each request re-checks the settings fingerprint,
/// but the provider is only reconstructed when the configuration changes.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<SqliteStore>,
    resolver: Arc<ProviderResolver>,
}

impl AppState {
    fn provider(&self) -> Result<Option<Arc<dyn EmbeddingProvider>>, AppError> {
        let settings = EmbeddingSettings::resolve(&self.config.embedding);
        self.resolver
            .resolve(&settings)
            .map_err(|e| internal(e.to_string()))
    }
}

/// Start the governance HTTP server on `[server].bind`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let pool = db::connect(config).await?;
    let store = Arc::new(SqliteStore::new(pool));

    let resolver = Arc::new(ProviderResolver::new());
    let settings = EmbeddingSettings::resolve(&config.embedding);
    match resolver.resolve(&settings)? {
        Some(p) => println!("embedding provider: {} ({} dims)", p.name(), p.dimensions()),
        None => println!("embedding provider: none (keyword search only)"),
    }

    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        resolver,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/governance", post(handle_ingest))
        .route("/governance/search", post(handle_search))
        .route("/governance/sections", get(handle_sections))
        .route("/governance/version", get(handle_version))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("governance server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Map engine errors onto HTTP statuses. Validation failures are client
/// errors; everything else is a 500.
fn classify_error(err: anyhow::Error) -> AppError {
    if let Some(validation) = err.downcast_ref::<ValidationError>() {
        return bad_request(validation.to_string());
    }
    internal(err.to_string())
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /governance ============

#[derive(Deserialize)]
struct IngestRequest {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

async fn handle_ingest(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<impl IntoResponse, AppError> {
    let content = req.content.unwrap_or_default();
    let version = req.version.unwrap_or_default();

    let provider = state.provider()?;
    let outcome = ingest_document(
        state.store.as_ref(),
        provider.as_ref(),
        &content,
        &version,
        state.config.chunking.split_threshold_lines,
    )
    .await
    .map_err(classify_error)?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

// ============ POST /governance/search ============

#[derive(Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    limit: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    results: Vec<SearchResultItem>,
    search_mode: SearchMode,
    count: usize,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = req.query.unwrap_or_default();
    let limit = match req.limit {
        None => state.config.retrieval.default_limit,
        Some(l) if l >= 1 => l as usize,
        Some(_) => return Err(bad_request(ValidationError::InvalidLimit.to_string())),
    };

    let provider = state.provider()?;
    let outcome = search_chunks(
        state.store.as_ref(),
        provider.as_ref(),
        &query,
        req.role.as_deref(),
        limit,
    )
    .await
    .map_err(classify_error)?;

    Ok(Json(SearchResponse {
        count: outcome.results.len(),
        results: outcome.results,
        search_mode: outcome.mode,
    }))
}

// ============ GET /governance/sections ============

#[derive(Deserialize)]
struct SectionsParams {
    #[serde(default)]
    version: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SectionsResponse {
    sections: Vec<SectionInfo>,
    count: usize,
    embedded_count: usize,
}

async fn handle_sections(
    State(state): State<AppState>,
    Query(params): Query<SectionsParams>,
) -> Result<Json<SectionsResponse>, AppError> {
    let sections = state
        .store
        .list_sections(params.version.as_deref())
        .await
        .map_err(classify_error)?;

    let embedded_count = sections.iter().filter(|s| s.has_embedding).count();
    Ok(Json(SectionsResponse {
        count: sections.len(),
        embedded_count,
        sections,
    }))
}

// ============ GET /governance/version ============

async fn handle_version(
    State(state): State<AppState>,
) -> Result<Json<crate::models::VersionInfo>, AppError> {
    match state.store.latest_version().await.map_err(classify_error)? {
        Some(info) => Ok(Json(info)),
        None => Err(not_found("no governance document ingested yet")),
    }
}
