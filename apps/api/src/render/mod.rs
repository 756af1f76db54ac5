//! Image Renderer — turns a template + captions into a hosted image URL.
//!
//! Each render is retried with backoff. If the requested meme still cannot be
//! rendered, one fallback meme is rendered instead (also with retries). There
//! is no second fallback: if that fails too, the error is returned.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::catalog::TemplateCatalog;
use crate::errors::MemeError;
use crate::resilience::fallback::FallbackCatalog;
use crate::resilience::{retry_with_backoff, RetryPolicy};

pub mod imgflip;

/// A hosted image returned by the captioning API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionedImage {
    pub url: String,
    pub page_url: Option<String>,
}

/// An image captioning backend. Implemented by `ImgflipClient` and by test fakes.
#[async_trait]
pub trait ImageCaptioner: Send + Sync {
    async fn caption_image(
        &self,
        template_id: u64,
        captions: &[String],
    ) -> Result<CaptionedImage, MemeError>;
}

/// Present when the renderer drew a fallback meme instead of the requested one.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSubstitution {
    pub hashtags: Vec<String>,
    /// Error that made the requested render give up.
    pub reason: String,
}

/// What was actually rendered. Differs from the request when `substitution` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub image: CaptionedImage,
    pub template_name: String,
    pub captions: Vec<String>,
    pub substitution: Option<RenderSubstitution>,
}

#[derive(Clone)]
pub struct ImageRenderer {
    captioner: Arc<dyn ImageCaptioner>,
    catalog: Arc<TemplateCatalog>,
    fallbacks: FallbackCatalog,
    retry: RetryPolicy,
}

impl ImageRenderer {
    pub fn new(
        captioner: Arc<dyn ImageCaptioner>,
        catalog: Arc<TemplateCatalog>,
        fallbacks: FallbackCatalog,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            captioner,
            catalog,
            fallbacks,
            retry,
        }
    }

    /// Renders `template_name` with `captions`, substituting a single fallback
    /// meme if the requested render exhausts its retries.
    pub async fn render(
        &self,
        template_name: &str,
        captions: &[String],
    ) -> Result<RenderedImage, MemeError> {
        match self.render_with_retry(template_name, captions).await {
            Ok(image) => Ok(RenderedImage {
                image,
                template_name: template_name.to_string(),
                captions: captions.to_vec(),
                substitution: None,
            }),
            Err(e) => {
                let fallback = self.fallbacks.pick(Some("during image creation"));
                warn!(
                    "Rendering '{}' failed ({e}), trying fallback '{}'",
                    template_name, fallback.template_name
                );

                let image = self
                    .render_with_retry(&fallback.template_name, &fallback.captions)
                    .await?;

                Ok(RenderedImage {
                    image,
                    template_name: fallback.template_name,
                    captions: fallback.captions,
                    substitution: Some(RenderSubstitution {
                        hashtags: fallback.hashtags,
                        reason: e.to_string(),
                    }),
                })
            }
        }
    }

    /// One retried render of exactly the requested meme.
    async fn render_with_retry(
        &self,
        template_name: &str,
        captions: &[String],
    ) -> Result<CaptionedImage, MemeError> {
        let template = self.catalog.get(template_name).ok_or_else(|| {
            MemeError::UpstreamApi(format!("unknown template '{template_name}'"))
        })?;
        let template_id = template.external_id;

        let image = retry_with_backoff(&self.retry, "image rendering", || {
            self.captioner.caption_image(template_id, captions)
        })
        .await?;

        info!("Rendered '{}': {}", template_name, image.url);
        Ok(image)
    }
}
