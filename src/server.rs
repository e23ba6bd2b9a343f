//! HTTP surface for documentation generation.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/generate` | Document the repository at `{"url": "..."}` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": "GitHub download failed: 404 Not Found" }
//! ```
//!
//! A missing or non-string `url` is a `400`; any failure while fetching,
//! embedding, retrieving, or generating is a `500`. No partial document is
//! ever returned.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::service::{DocService, GenerateResponse};

/// Shared state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    service: Arc<DocService>,
}

/// Bind to `[server].bind` and serve until the process is terminated.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let service = Arc::new(DocService::new(config)?);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "repodoc server listening");
    axum::serve(listener, router(service)).await?;

    Ok(())
}

/// Build the application router around a service.
pub fn router(service: Arc<DocService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/generate", post(handle_generate))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { service })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "generation request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: format!("{:#}", err),
    }
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

// ============ POST /api/generate ============

/// Handler for `POST /api/generate`.
///
/// The body is taken as loose JSON so a missing `url` yields the documented
/// `400` envelope. Extractor rejections (bad JSON, wrong content type) keep
/// axum's status but are reported in the same `{"error": ...}` shape.
async fn handle_generate(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let Json(body) = payload.map_err(|rej| AppError {
        status: rej.status(),
        message: rej.body_text(),
    })?;
    let url = body
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| bad_request("Missing 'url' string"))?;

    let response = state.service.generate_from_url(url).await.map_err(internal)?;
    Ok(Json(response))
}
