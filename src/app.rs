use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, SecurityConfig, StorageBackend};
use crate::handlers::h5p;
use crate::services::ContentService;
use crate::storage::{ContentStorage, FileContentStorage, MemoryContentStorage, StorageError};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub content: ContentService,
}

impl AppState {
    pub fn new(content: ContentService) -> Self {
        Self { content }
    }
}

/// Open the configured storage backend and wire up the content service
pub async fn build_state(config: &AppConfig) -> Result<AppState, StorageError> {
    let storage: Arc<dyn ContentStorage> = match config.content.storage {
        StorageBackend::File => Arc::new(FileContentStorage::new(config.content.content_path.clone()).await?),
        StorageBackend::Memory => Arc::new(MemoryContentStorage::new()),
    };

    let content = ContentService::new(storage)
        .with_max_params_depth(config.content.max_params_depth)
        .with_public_url(config.server.public_url.clone());

    Ok(AppState::new(content))
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(content_routes())
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .with_state(state);

    // Global middleware
    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn content_routes() -> Router<AppState> {
    Router::new()
        // Editor save and read-back
        .route("/api/h5p/save", post(h5p::save_post))
        .route("/api/h5p/params/:content_id", get(h5p::params_get))
        // Content management
        .route("/api/h5p/contents", get(h5p::contents_list))
        .route(
            "/api/h5p/contents/:id",
            get(h5p::contents_get).delete(h5p::contents_delete),
        )
        // Files stored with content (images, audio, content.json)
        .route("/api/h5p/content/:content_id/*file", get(h5p::content_file_get))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "H5P Content API",
            "version": version,
            "description": "H5P content save pipeline and content storage",
            "endpoints": {
                "save": "POST /api/h5p/save",
                "params": "GET /api/h5p/params/:contentId",
                "contents": "GET /api/h5p/contents, GET|DELETE /api/h5p/contents/:id",
                "files": "GET /api/h5p/content/:contentId/*file",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.content.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "storage": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "storage unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "storage_error": e.to_string()
                }
            })),
        ),
    }
}
