//! Response Normalizer — pulls a JSON value out of free-form model output.
//!
//! Models asked for "JSON only" still answer with "Sure! Here you go: {...}",
//! trailing commas, or code fences. This module finds the payload, parses it
//! strictly, and on failure falls back to scraping the two fields the caption
//! step needs.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Value};

use crate::errors::MemeError;

/// First shallow `{...}` or `[...]`. Nested braces/brackets are not balanced.
static PAYLOAD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^{}]*\}|\[[^\[\]]*\]").unwrap());

static TEMPLATE_NAME_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""template_name"\s*:\s*"([^"]+)""#).unwrap());

static TEXT_ARRAY_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)"text_array"\s*:\s*\[(.*?)\]"#).unwrap());

/// Returns the first shallow object/array in `raw`, or all of `raw` if there is none.
pub fn extract_payload(raw: &str) -> &str {
    PAYLOAD_PATTERN
        .find(raw)
        .map(|m| m.as_str())
        .unwrap_or(raw)
}

/// Extracts a JSON value from raw model output.
///
/// Errors: `EmptyResponse` for blank input, `MalformedResponse` when neither
/// strict parsing nor field scraping yields anything.
pub fn normalize_response(raw: &str) -> Result<Value, MemeError> {
    if raw.trim().is_empty() {
        return Err(MemeError::EmptyResponse);
    }

    let candidate = extract_payload(raw);

    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => Ok(value),
        Err(parse_err) => extract_known_fields(candidate).ok_or_else(|| {
            MemeError::MalformedResponse(format!(
                "{parse_err}; field extraction also failed for {:?}",
                truncate_for_log(candidate)
            ))
        }),
    }
}

/// Scrapes `template_name` and `text_array` from text that is not valid JSON.
/// Both must be present.
fn extract_known_fields(text: &str) -> Option<Value> {
    let template_name = TEMPLATE_NAME_FIELD.captures(text)?.get(1)?.as_str();
    let items = TEXT_ARRAY_FIELD.captures(text)?.get(1)?.as_str();

    let text_array: Vec<String> = if items.trim().is_empty() {
        Vec::new()
    } else {
        items
            .split(',')
            .map(|item| {
                item.trim_matches(|c: char| c.is_whitespace() || c == '"')
                    .to_string()
            })
            .collect()
    };

    Some(json!({
        "template_name": template_name,
        "text_array": text_array,
    }))
}

fn truncate_for_log(text: &str) -> String {
    text.chars().take(120).collect()
}
