// Prompt templates for the caption and hashtag passes.
// The system prompt is shared: llm_client::prompts::JSON_ONLY_SYSTEM.

/// Caption prompt. Replace `{template_info}` first, then `{input_text}`.
pub const CAPTION_PROMPT_TEMPLATE: &str = r#"Create a meme based on this input text: "{input_text}"

Available templates (pick one):
{template_info}

Respond with ONLY a JSON object in this exact format:
{
    "template_name": "TEMPLATE_NAME",
    "text_array": ["CAPTION1", "CAPTION2"]
}

Requirements:
- Use exact template names from the list above
- Number of captions must match the template's panel count
- Make it funny and creative
- RESPOND WITH ONLY THE JSON OBJECT, NO OTHER TEXT"#;

/// Hashtag prompt. Replace: {template_name}, {captions}, {input_text}
pub const HASHTAG_PROMPT_TEMPLATE: &str = r#"Generate relevant hashtags for a meme with the following information:

Post context: "{input_text}"
Meme template used: "{template_name}"
Meme captions: {captions}

Requirements:
- Generate 3-5 relevant hashtags
- Include both general and specific hashtags
- Make them engaging and trendy
- Don't include spaces in hashtags
- Remove any special characters
- Respond with ONLY a JSON array of hashtags, example:
["hashtag1", "hashtag2", "hashtag3"]"#;
