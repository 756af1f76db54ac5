// Shared prompt constants.
// Each pipeline stage that calls the LLM defines its own prompts alongside it.

/// System prompt that asks for bare JSON output.
///
/// Models still wrap JSON in prose now and then; the response normalizer
/// tolerates that, this only makes it rarer.
pub const JSON_ONLY_SYSTEM: &str = "You are a meme generator API. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";
