//! Meme pipeline — caption → hashtags → image, with a last-resort fallback.
//!
//! Flow: CaptionGenerator::generate → ImageRenderer::render, retried together
//! as one unit. If the unit keeps failing, a fresh fallback meme is rendered
//! (once, relying on the renderer's own retries) and flagged as such.

use std::sync::Arc;

use tracing::{info, warn};

use crate::catalog::TemplateCatalog;
use crate::errors::MemeError;
use crate::generation::caption::CaptionGenerator;
use crate::llm_client::TextGenerator;
use crate::render::{ImageCaptioner, ImageRenderer, RenderedImage};
use crate::resilience::fallback::FallbackCatalog;
use crate::resilience::{retry_with_backoff, RetryPolicy};

/// The finished meme handed back to the caller. Built fresh per request.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMeme {
    pub url: String,
    pub page_url: Option<String>,
    pub template_used: String,
    pub captions: Vec<String>,
    pub hashtags: Vec<String>,
    pub used_fallback: bool,
    pub error_detail: Option<String>,
}

impl RenderedMeme {
    fn from_render(rendered: RenderedImage, hashtags: Vec<String>, reason: Option<String>) -> Self {
        let (hashtags, reason) = match rendered.substitution {
            Some(sub) => (sub.hashtags, Some(sub.reason)),
            None => (hashtags, reason),
        };

        Self {
            url: rendered.image.url,
            page_url: rendered.image.page_url,
            template_used: rendered.template_name,
            captions: rendered.captions,
            hashtags,
            used_fallback: reason.is_some(),
            error_detail: reason,
        }
    }
}

/// Explicitly constructed pipeline service, shared across requests via `Arc`.
#[derive(Clone)]
pub struct MemeService {
    captions: CaptionGenerator,
    renderer: ImageRenderer,
    fallbacks: FallbackCatalog,
    retry: RetryPolicy,
}

impl MemeService {
    pub fn new(
        llm: Arc<dyn TextGenerator>,
        captioner: Arc<dyn ImageCaptioner>,
        catalog: Arc<TemplateCatalog>,
        fallbacks: FallbackCatalog,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            captions: CaptionGenerator::new(llm, catalog.clone(), fallbacks.clone(), retry),
            renderer: ImageRenderer::new(captioner, catalog, fallbacks.clone(), retry),
            fallbacks,
            retry,
        }
    }

    /// Produces a meme for `input_text`.
    ///
    /// Only errors when even the last-resort fallback cannot be rendered,
    /// i.e. the captioning API is unreachable.
    pub async fn handle_request(&self, input_text: &str) -> Result<RenderedMeme, MemeError> {
        let outcome = retry_with_backoff(&self.retry, "meme pipeline", || {
            self.caption_and_render(input_text)
        })
        .await;

        let error = match outcome {
            Ok(meme) => {
                info!(
                    "Meme ready: template='{}' fallback={}",
                    meme.template_used, meme.used_fallback
                );
                return Ok(meme);
            }
            Err(e) => e,
        };

        let fallback = self.fallbacks.pick(None);
        warn!(
            "Meme pipeline exhausted ({error}), rendering fallback '{}'",
            fallback.template_name
        );

        let rendered = self
            .renderer
            .render(&fallback.template_name, &fallback.captions)
            .await?;

        let mut meme = RenderedMeme::from_render(rendered, fallback.hashtags, None);
        meme.used_fallback = true;
        meme.error_detail = Some(error.to_string());
        Ok(meme)
    }

    async fn caption_and_render(&self, input_text: &str) -> Result<RenderedMeme, MemeError> {
        let caption = self.captions.generate(input_text).await;
        let rendered = self
            .renderer
            .render(&caption.template_name, &caption.captions)
            .await?;
        Ok(RenderedMeme::from_render(
            rendered,
            caption.hashtags,
            caption.fallback_reason,
        ))
    }
}
