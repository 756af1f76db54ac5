// Meme generation pipeline.
// Implements: response normalization, caption + hashtag passes, orchestration.
// All LLM calls go through the llm_client::TextGenerator trait.

pub mod caption;
pub mod handlers;
pub mod hashtags;
pub mod normalizer;
pub mod pipeline;
pub mod prompts;
