use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{health, rag};
use crate::state::AppState;

/// Creates the application router.
///
/// - Liveness endpoints (`/`, `/health`) and service status
/// - `POST /rag` retrieval endpoint
/// - CORS for the configured front-end origins, HTTP tracing
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server.cors_allowed_origins);
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/api/status", get(health::get_status))
        .route("/rag", post(rag::rag_search))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_origins = origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();

    if allowed_origins.is_empty() {
        tracing::warn!("No valid CORS origins configured; cross-origin requests will be refused");
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}
