//! Static fallback memes, served when live generation or rendering gives up.

use std::sync::Arc;

use anyhow::{bail, Result};
use rand::Rng;

use crate::catalog::TemplateCatalog;

/// A pre-authored meme that needs no text generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackOption {
    pub template_name: String,
    pub captions: Vec<String>,
    pub hashtags: Vec<String>,
}

/// Chooses which fallback to serve. Injectable so tests can pin the choice.
pub trait FallbackSelector: Send + Sync {
    /// Returns an index in `0..len`. `len` is never zero.
    fn select(&self, len: usize) -> usize;
}

/// Uniform random choice.
pub struct RandomSelector;

impl FallbackSelector for RandomSelector {
    fn select(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|t| t.to_string()).collect()
}

/// Builds the fixed fallback set. `context` explains why the fallback was
/// needed and ends up in the caption of the meme that has room for it.
fn fallback_options(context: Option<&str>) -> Vec<FallbackOption> {
    let failure_caption = match context {
        Some(ctx) if !ctx.trim().is_empty() => format!("When the AI fails {}", ctx.trim()),
        _ => "When the AI fails".to_string(),
    };

    vec![
        FallbackOption {
            template_name: "This Is Fine".to_string(),
            captions: vec!["When your AI".to_string(), "stops working".to_string()],
            hashtags: tags(&["#AIFail", "#TechHumor", "#ThisIsFine"]),
        },
        FallbackOption {
            template_name: "Drake Hotline Bling".to_string(),
            captions: vec![
                "Getting a proper AI response".to_string(),
                "Getting a fallback meme instead".to_string(),
            ],
            hashtags: tags(&["#AI", "#TechFail", "#Debugging"]),
        },
        FallbackOption {
            template_name: "Hide the Pain Harold".to_string(),
            captions: vec![failure_caption, String::new()],
            hashtags: tags(&["#AIProblems", "#TechHumor", "#Programming"]),
        },
    ]
}

#[derive(Clone)]
pub struct FallbackCatalog {
    selector: Arc<dyn FallbackSelector>,
}

impl FallbackCatalog {
    pub fn new(selector: Arc<dyn FallbackSelector>) -> Self {
        Self { selector }
    }

    /// Checks every fallback against the template catalog. A fallback that
    /// cannot render would defeat its purpose, so startup fails instead.
    pub fn validate(&self, catalog: &TemplateCatalog) -> Result<()> {
        for option in fallback_options(None) {
            let Some(entry) = catalog.get(&option.template_name) else {
                bail!(
                    "Fallback template '{}' is missing from the template catalog",
                    option.template_name
                );
            };
            if entry.slot_count != option.captions.len() {
                bail!(
                    "Fallback template '{}' has {} boxes but the fallback supplies {} captions",
                    option.template_name,
                    entry.slot_count,
                    option.captions.len()
                );
            }
        }
        Ok(())
    }

    pub fn pick(&self, context: Option<&str>) -> FallbackOption {
        let mut options = fallback_options(context);
        let index = self.selector.select(options.len()).min(options.len() - 1);
        options.swap_remove(index)
    }
}
