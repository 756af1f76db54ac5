//! Scripted stand-ins for the upstream services, shared by unit tests.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::MemeError;
use crate::llm_client::{LlmError, TextGenerator};
use crate::render::{CaptionedImage, ImageCaptioner};
use crate::resilience::fallback::{FallbackCatalog, FallbackSelector};
use crate::resilience::RetryPolicy;

/// Always picks the same fallback index.
pub struct FixedSelector(pub usize);

impl FallbackSelector for FixedSelector {
    fn select(&self, _len: usize) -> usize {
        self.0
    }
}

pub fn fixed_fallbacks(index: usize) -> FallbackCatalog {
    FallbackCatalog::new(Arc::new(FixedSelector(index)))
}

/// Three attempts, no sleeping.
pub fn instant_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::ZERO,
    }
}

pub fn reply(text: &str) -> Result<String, LlmError> {
    Ok(text.to_string())
}

/// Replays queued replies in order; once the queue is empty every call fails.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }
}

/// Captioning API fake. Succeeds with `https://i.imgflip.com/<id>.jpg` unless
/// told to fail the first N calls or every call for certain template ids.
pub struct FakeCaptioner {
    fail_first: usize,
    failing_ids: HashSet<u64>,
    requests: Mutex<Vec<(u64, Vec<String>)>>,
}

impl FakeCaptioner {
    pub fn new() -> Self {
        Self::failing_first(0)
    }

    pub fn failing_first(n: usize) -> Self {
        Self {
            fail_first: n,
            failing_ids: HashSet::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing() -> Self {
        Self::failing_first(usize::MAX)
    }

    pub fn failing_templates(ids: &[u64]) -> Self {
        Self {
            fail_first: 0,
            failing_ids: ids.iter().copied().collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<(u64, Vec<String>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageCaptioner for FakeCaptioner {
    async fn caption_image(
        &self,
        template_id: u64,
        captions: &[String],
    ) -> Result<CaptionedImage, MemeError> {
        let call_index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push((template_id, captions.to_vec()));
            requests.len() - 1
        };

        if call_index < self.fail_first || self.failing_ids.contains(&template_id) {
            return Err(MemeError::UpstreamApi(format!(
                "template {template_id} unavailable"
            )));
        }

        Ok(CaptionedImage {
            url: format!("https://i.imgflip.com/{template_id}.jpg"),
            page_url: Some(format!("https://imgflip.com/i/{template_id}")),
        })
    }
}
