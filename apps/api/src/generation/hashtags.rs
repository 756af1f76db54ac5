//! Hashtag Generator — one LLM pass, no retries, never fails.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::MemeError;
use crate::generation::normalizer::normalize_response;
use crate::generation::prompts::HASHTAG_PROMPT_TEMPLATE;
use crate::llm_client::TextGenerator;

/// Served whenever the hashtag pass fails for any reason.
pub const DEFAULT_HASHTAGS: [&str; 2] = ["#meme", "#funny"];
const MAX_HASHTAGS: usize = 5;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W").unwrap());

/// Cleans one raw tag into `#token` form. `None` if nothing survives.
pub fn sanitize_hashtag(raw: &str) -> Option<String> {
    let without_hash = raw.replace('#', "");
    let token = NON_WORD.replace_all(without_hash.trim(), "");
    if token.is_empty() {
        None
    } else {
        Some(format!("#{token}"))
    }
}

/// Sanitizes every tag, drops empties, keeps the first five. Idempotent.
pub fn sanitize_hashtags<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .filter_map(|tag| sanitize_hashtag(tag.as_ref()))
        .take(MAX_HASHTAGS)
        .collect()
}

pub fn default_hashtags() -> Vec<String> {
    DEFAULT_HASHTAGS.iter().map(|t| t.to_string()).collect()
}

fn build_hashtag_prompt(input_text: &str, template_name: &str, captions: &[String]) -> String {
    let captions_json = serde_json::to_string(captions).unwrap_or_default();
    HASHTAG_PROMPT_TEMPLATE
        .replace("{template_name}", template_name)
        .replace("{captions}", &captions_json)
        .replace("{input_text}", input_text)
}

/// Asks the model for 3–5 hashtags describing the finished meme.
///
/// Any failure (service error, unparseable reply, non-array reply, nothing left
/// after sanitizing) yields `DEFAULT_HASHTAGS`.
pub async fn generate_hashtags(
    llm: &dyn TextGenerator,
    input_text: &str,
    template_name: &str,
    captions: &[String],
) -> Vec<String> {
    match request_hashtags(llm, input_text, template_name, captions).await {
        Ok(tags) if !tags.is_empty() => tags,
        Ok(_) => {
            warn!("Hashtag reply had no usable tags, using defaults");
            default_hashtags()
        }
        Err(e) => {
            warn!("Hashtag generation failed, using defaults: {e}");
            default_hashtags()
        }
    }
}

async fn request_hashtags(
    llm: &dyn TextGenerator,
    input_text: &str,
    template_name: &str,
    captions: &[String],
) -> Result<Vec<String>, MemeError> {
    let prompt = build_hashtag_prompt(input_text, template_name, captions);
    let raw = llm.generate(&prompt).await?;
    debug!("Hashtag LLM response: {raw}");

    match normalize_response(&raw)? {
        Value::Array(items) => {
            let tags: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
            match tags {
                Some(tags) => Ok(sanitize_hashtags(&tags)),
                None => Err(MemeError::InvalidStructure(
                    "hashtag list contains a non-string element".to_string(),
                )),
            }
        }
        other => Err(MemeError::InvalidStructure(format!(
            "expected a JSON array of hashtags, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use crate::testing::{reply, ScriptedGenerator};

    fn captions() -> Vec<String> {
        vec!["Writing tests".to_string(), "Shipping on Friday".to_string()]
    }

    #[test]
    fn test_sanitize_strips_hashes_whitespace_and_symbols() {
        let raw = ["#Funny!", " tech ", "##AI"];
        assert_eq!(sanitize_hashtags(&raw), vec!["#Funny", "#tech", "#AI"]);
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let once = sanitize_hashtags(&["#Dev Life", "rust-lang", "#100DaysOfCode", "  ", "#!?"]);
        let twice = sanitize_hashtags(&once);
        assert_eq!(once, vec!["#DevLife", "#rustlang", "#100DaysOfCode"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sanitize_caps_at_five() {
        let raw = ["a", "b", "c", "d", "e", "f", "g"];
        assert_eq!(sanitize_hashtags(&raw), vec!["#a", "#b", "#c", "#d", "#e"]);
    }

    #[test]
    fn test_sanitize_keeps_underscores() {
        assert_eq!(sanitize_hashtag("#snake_case"), Some("#snake_case".to_string()));
        assert_eq!(sanitize_hashtag("#"), None);
    }

    #[test]
    fn test_prompt_embeds_context() {
        let prompt = build_hashtag_prompt("deploy day", "This Is Fine", &captions());
        assert!(prompt.contains(r#"Post context: "deploy day""#));
        assert!(prompt.contains(r#"Meme template used: "This Is Fine""#));
        assert!(prompt.contains(r#"["Writing tests","Shipping on Friday"]"#));
    }

    #[tokio::test]
    async fn test_generates_cleaned_tags_from_prose_reply() {
        let llm = ScriptedGenerator::new(vec![reply(
            r###"Here are some: ["#Funny!", " tech ", "##AI"]"###,
        )]);
        let tags = generate_hashtags(&llm, "post", "Drake Hotline Bling", &captions()).await;
        assert_eq!(tags, vec!["#Funny", "#tech", "#AI"]);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_object_reply_falls_back_to_defaults() {
        let llm = ScriptedGenerator::new(vec![reply(r##"{"hashtags": ["#a"]}"##)]);
        let tags = generate_hashtags(&llm, "post", "Drake Hotline Bling", &captions()).await;
        assert_eq!(tags, default_hashtags());
    }

    #[tokio::test]
    async fn test_service_error_falls_back_to_defaults_without_retry() {
        let llm = ScriptedGenerator::new(vec![Err(LlmError::Api {
            status: 529,
            message: "overloaded".to_string(),
        })]);
        let tags = generate_hashtags(&llm, "post", "Drake Hotline Bling", &captions()).await;
        assert_eq!(tags, vec!["#meme", "#funny"]);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_non_string_tag_falls_back_to_defaults() {
        let llm = ScriptedGenerator::new(vec![reply(r##"["#a", 1]"##)]);
        let tags = generate_hashtags(&llm, "post", "Drake Hotline Bling", &captions()).await;
        assert_eq!(tags, default_hashtags());
    }

    #[tokio::test]
    async fn test_all_empty_tags_fall_back_to_defaults() {
        let llm = ScriptedGenerator::new(vec![reply(r##"["#", "  ", "!!"]"##)]);
        let tags = generate_hashtags(&llm, "post", "Drake Hotline Bling", &captions()).await;
        assert_eq!(tags, default_hashtags());
    }
}
