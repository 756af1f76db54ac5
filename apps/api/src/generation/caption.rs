//! Caption Generator — picks a template and writes its captions.
//!
//! Flow per attempt: prompt → LLM → normalize → repair against the catalog →
//! hashtags. Attempts are retried with backoff; once they are exhausted a
//! static fallback meme is returned instead, so `generate` never fails.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::catalog::TemplateCatalog;
use crate::errors::MemeError;
use crate::generation::hashtags::generate_hashtags;
use crate::generation::normalizer::normalize_response;
use crate::generation::prompts::CAPTION_PROMPT_TEMPLATE;
use crate::llm_client::TextGenerator;
use crate::resilience::fallback::{FallbackCatalog, FallbackOption};
use crate::resilience::{retry_with_backoff, RetryPolicy};

/// Output of the caption step.
///
/// `template_name` is always a catalog key and `captions.len()` always equals
/// that template's slot count.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionResult {
    pub template_name: String,
    pub captions: Vec<String>,
    pub hashtags: Vec<String>,
    /// Why live generation was abandoned, when a fallback meme was substituted.
    pub fallback_reason: Option<String>,
}

impl CaptionResult {
    fn from_fallback(option: FallbackOption, reason: String) -> Self {
        Self {
            template_name: option.template_name,
            captions: option.captions,
            hashtags: option.hashtags,
            fallback_reason: Some(reason),
        }
    }
}

/// Template and captions after validation and repair, before hashtags.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionDraft {
    pub template_name: String,
    pub captions: Vec<String>,
}

/// Validates a normalized model reply and repairs it against the catalog.
///
/// 1. Must be an object with `template_name` and `text_array`.
/// 2. Unknown template names are replaced by the closest catalog entry.
/// 3. A non-list `text_array` becomes a one-element list of its string form.
/// 4. Captions are padded with "" or truncated to the template's slot count.
pub fn repair_caption(value: Value, catalog: &TemplateCatalog) -> Result<CaptionDraft, MemeError> {
    let mut fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err(MemeError::InvalidStructure(format!(
                "expected a JSON object, got {other}"
            )))
        }
    };

    let (Some(raw_name), Some(raw_captions)) =
        (fields.remove("template_name"), fields.remove("text_array"))
    else {
        return Err(MemeError::InvalidStructure(
            "missing template_name or text_array".to_string(),
        ));
    };

    let requested = value_to_text(raw_name);
    let template = catalog.closest_match(&requested);
    if template.name != requested {
        info!(
            "Invalid template '{}' corrected to '{}'",
            requested, template.name
        );
    }

    let mut captions = match raw_captions {
        Value::Array(items) => items.into_iter().map(value_to_text).collect(),
        other => vec![value_to_text(other)],
    };
    captions.resize(template.slot_count, String::new());

    Ok(CaptionDraft {
        template_name: template.name.clone(),
        captions,
    })
}

/// Strings keep their contents; everything else uses its JSON rendering.
fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

pub fn build_caption_prompt(input_text: &str, catalog: &TemplateCatalog) -> String {
    CAPTION_PROMPT_TEMPLATE
        .replace("{template_info}", &catalog.render_for_prompt())
        .replace("{input_text}", input_text)
}

#[derive(Clone)]
pub struct CaptionGenerator {
    llm: Arc<dyn TextGenerator>,
    catalog: Arc<TemplateCatalog>,
    fallbacks: FallbackCatalog,
    retry: RetryPolicy,
}

impl CaptionGenerator {
    pub fn new(
        llm: Arc<dyn TextGenerator>,
        catalog: Arc<TemplateCatalog>,
        fallbacks: FallbackCatalog,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            llm,
            catalog,
            fallbacks,
            retry,
        }
    }

    /// Generates a schema-valid caption for `input_text`. Never fails.
    pub async fn generate(&self, input_text: &str) -> CaptionResult {
        let prompt = build_caption_prompt(input_text, &self.catalog);
        let prompt = prompt.as_str();

        let outcome = retry_with_backoff(&self.retry, "caption generation", || {
            self.attempt(input_text, prompt)
        })
        .await;

        match outcome {
            Ok(result) => result,
            Err(e) => {
                let fallback = self.fallbacks.pick(Some("after multiple attempts"));
                warn!(
                    "Caption generation exhausted, serving fallback '{}': {e}",
                    fallback.template_name
                );
                CaptionResult::from_fallback(fallback, e.to_string())
            }
        }
    }

    async fn attempt(&self, input_text: &str, prompt: &str) -> Result<CaptionResult, MemeError> {
        let raw = self.llm.generate(prompt).await?;
        debug!("Caption LLM response: {raw}");

        let value = normalize_response(&raw)?;
        let draft = repair_caption(value, &self.catalog)?;

        let hashtags = generate_hashtags(
            self.llm.as_ref(),
            input_text,
            &draft.template_name,
            &draft.captions,
        )
        .await;

        Ok(CaptionResult {
            template_name: draft.template_name,
            captions: draft.captions,
            hashtags,
            fallback_reason: None,
        })
    }
}
