mod catalog;
mod config;
mod errors;
mod generation;
mod llm_client;
mod render;
mod resilience;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::catalog::TemplateCatalog;
use crate::config::Config;
use crate::generation::pipeline::MemeService;
use crate::llm_client::LlmClient;
use crate::render::imgflip::ImgflipClient;
use crate::resilience::fallback::{FallbackCatalog, RandomSelector};
use crate::resilience::RetryPolicy;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting memegen v{}", env!("CARGO_PKG_VERSION"));

    // Template catalog: file override or built-in list
    let catalog = match &config.templates_path {
        Some(path) => TemplateCatalog::load(path)?,
        None => TemplateCatalog::builtin()?,
    };
    info!("Template catalog loaded ({} templates)", catalog.len());
    let catalog = Arc::new(catalog);

    // Fallback memes must be renderable with this catalog
    let fallbacks = FallbackCatalog::new(Arc::new(RandomSelector));
    fallbacks.validate(&catalog)?;

    // Upstream clients
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let imgflip = ImgflipClient::new(
        config.imgflip_api_url.clone(),
        config.imgflip_username.clone(),
        config.imgflip_password.clone(),
        Duration::from_secs(config.image_timeout_secs),
    )?;
    info!("Imgflip client initialized ({})", config.imgflip_api_url);

    let retry = RetryPolicy {
        max_attempts: config.retry_max_attempts,
        base_delay: Duration::from_millis(config.retry_base_delay_ms),
    };
    info!(
        "Retry policy: {} attempts, {}ms base delay",
        retry.max_attempts,
        retry.base_delay.as_millis()
    );

    let memes = MemeService::new(
        Arc::new(llm),
        Arc::new(imgflip),
        catalog.clone(),
        fallbacks,
        retry,
    );

    // Build app state
    let state = AppState {
        memes: Arc::new(memes),
        catalog,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
