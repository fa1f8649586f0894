use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::embedding::EncoderError;
use crate::index::IndexError;
use crate::retrieval::RetrievalError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("bad gateway: {0}")]
    BadGateway(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        match &err {
            RetrievalError::EncodingFailed(EncoderError::Rejected(_)) => {
                ApiError::BadRequest(err.to_string())
            }
            RetrievalError::EncodingFailed(_) => ApiError::BadGateway(err.to_string()),
            RetrievalError::SearchFailed(IndexError::DimensionMismatch { .. }) => {
                ApiError::Internal(err.to_string())
            }
            RetrievalError::SearchFailed(_) => ApiError::BadGateway(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
