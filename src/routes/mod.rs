use axum::{extract::{DefaultBodyLimit, State}, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{models::StatusResponse, AppState};

pub mod insights;

/// Full application router with CORS, upload limit and request tracing.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Mirrors the caller's origin, methods and headers and allows credentials.
    let cors = CorsLayer::very_permissive()
        .max_age(Duration::from_secs(3600));
    let max_file_size = state.config.max_file_size;

    Router::new()
        .merge(routes())
        .merge(insights::routes())
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/status", get(status))
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "CSV Insights API is running" }))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "backend": "ok" }))
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        backend: "ok",
        llm: if state.llm.is_available() { "connected" } else { "not_configured" },
    })
}
