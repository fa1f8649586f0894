use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "RAG API is running" }))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let orchestrator = &state.orchestrator;
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "index": {
            "name": state.index.name,
            "dimension": state.index.dimension,
            "metric": state.index.metric,
            "backend": state.settings.index.backend,
        },
        "embedding_model": state.settings.embedding.model,
        "top_k": orchestrator.top_k(),
        "started_at": state.started_at.to_rfc3339(),
    }))
}
