use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

/// Failures inside the generation pipeline.
///
/// None of these reach the caller directly: they are absorbed by retry and
/// then by fallback substitution. Only the rendered text of the last one is
/// surfaced, in the `error` field of a fallback response.
#[derive(Debug, Error)]
pub enum MemeError {
    #[error("Empty response from text generation service")]
    EmptyResponse,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid response structure: {0}")]
    InvalidStructure(String),

    #[error("Imgflip API error: {0}")]
    UpstreamApi(String),

    #[error("Text generation failed: {0}")]
    Generation(#[from] LlmError),
}

/// Transport-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Meme(#[from] MemeError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Meme(e) => {
                tracing::error!("Meme generation failed after all fallbacks: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
