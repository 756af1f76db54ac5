use std::sync::Arc;

use crate::catalog::TemplateCatalog;
use crate::generation::pipeline::MemeService;

/// Shared application state injected into all route handlers via Axum extractors.
/// Read-only after startup; requests share nothing mutable.
#[derive(Clone)]
pub struct AppState {
    pub memes: Arc<MemeService>,
    pub catalog: Arc<TemplateCatalog>,
}
