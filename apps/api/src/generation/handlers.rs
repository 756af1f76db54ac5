//! Axum route handlers for the meme API.

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::catalog::TemplateListing;
use crate::errors::AppError;
use crate::generation::pipeline::RenderedMeme;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateMemeRequest {
    pub tweet: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateMemeResponse {
    pub success: bool,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    pub template_used: String,
    pub captions: Vec<String>,
    pub hashtags: Vec<String>,
    /// Only present (and `true`) when a fallback meme was served.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<RenderedMeme> for GenerateMemeResponse {
    fn from(meme: RenderedMeme) -> Self {
        Self {
            success: true,
            url: meme.url,
            page_url: meme.page_url,
            template_used: meme.template_used,
            captions: meme.captions,
            hashtags: meme.hashtags,
            fallback: meme.used_fallback.then_some(true),
            error: meme.error_detail,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /generate-meme
///
/// Turns `tweet` into a captioned meme. Input errors are rejected with 400
/// before the pipeline runs; pipeline failures degrade to a fallback meme.
pub async fn handle_generate_meme(
    State(state): State<AppState>,
    payload: Option<Json<GenerateMemeRequest>>,
) -> Result<Json<GenerateMemeResponse>, AppError> {
    let Some(Json(request)) = payload else {
        return Err(AppError::InvalidInput("No JSON data provided".to_string()));
    };

    let tweet = request
        .tweet
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("No tweet provided".to_string()))?;

    let request_id = Uuid::new_v4();
    let meme = state
        .memes
        .handle_request(&tweet)
        .instrument(info_span!("generate_meme", %request_id))
        .await?;

    Ok(Json(meme.into()))
}

/// GET /templates
///
/// Returns the full catalog as `{name: {template_id, box_count}}`.
pub async fn handle_list_templates(
    State(state): State<AppState>,
) -> Json<BTreeMap<String, TemplateListing>> {
    Json(state.catalog.listing())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meme(used_fallback: bool, error_detail: Option<&str>) -> RenderedMeme {
        RenderedMeme {
            url: "https://i.imgflip.com/x.jpg".to_string(),
            page_url: None,
            template_used: "This Is Fine".to_string(),
            captions: vec!["When your AI".to_string(), "stops working".to_string()],
            hashtags: vec!["#AIFail".to_string()],
            used_fallback,
            error_detail: error_detail.map(str::to_string),
        }
    }

    #[test]
    fn test_live_response_omits_fallback_fields() {
        let value = serde_json::to_value(GenerateMemeResponse::from(meme(false, None))).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["template_used"], "This Is Fine");
        assert!(value.get("fallback").is_none());
        assert!(value.get("error").is_none());
        assert!(value.get("page_url").is_none());
    }

    #[test]
    fn test_fallback_response_carries_flag_and_error() {
        let value = serde_json::to_value(GenerateMemeResponse::from(meme(
            true,
            Some("Imgflip API error: down"),
        )))
        .unwrap();
        assert_eq!(value["fallback"], true);
        assert_eq!(value["error"], "Imgflip API error: down");
    }

    #[test]
    fn test_request_tolerates_missing_tweet() {
        let request: GenerateMemeRequest = serde_json::from_str("{}").unwrap();
        assert!(request.tweet.is_none());
    }
}
