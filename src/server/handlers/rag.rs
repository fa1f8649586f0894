use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::core::errors::ApiError;
use crate::retrieval::{Query, RetrievalResponse};
use crate::state::AppState;

/// `POST /rag` — `{ "query": "..." }` → context, sources and match count.
pub async fn rag_search(
    State(state): State<Arc<AppState>>,
    Json(query): Json<Query>,
) -> Result<Json<RetrievalResponse>, ApiError> {
    let response = state.orchestrator.retrieve(&query).await?;
    Ok(Json(response))
}
