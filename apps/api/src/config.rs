use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

const DEFAULT_IMGFLIP_API_URL: &str = "https://api.imgflip.com/caption_image";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub imgflip_username: String,
    pub imgflip_password: String,
    pub imgflip_api_url: String,
    /// Optional JSON catalog in the `GET /templates` shape. Built-in catalog when unset.
    pub templates_path: Option<PathBuf>,
    pub llm_timeout_secs: u64,
    pub image_timeout_secs: u64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            imgflip_username: require_env("IMGFLIP_USERNAME")?,
            imgflip_password: require_env("IMGFLIP_PASSWORD")?,
            imgflip_api_url: std::env::var("IMGFLIP_API_URL")
                .unwrap_or_else(|_| DEFAULT_IMGFLIP_API_URL.to_string()),
            templates_path: std::env::var("TEMPLATES_PATH").ok().map(PathBuf::from),
            llm_timeout_secs: parse_env_or("LLM_TIMEOUT_SECS", 60)?,
            image_timeout_secs: parse_env_or("IMAGE_TIMEOUT_SECS", 30)?,
            retry_max_attempts: parse_env_or("RETRY_MAX_ATTEMPTS", 3)?,
            retry_base_delay_ms: parse_env_or("RETRY_BASE_DELAY_MS", 500)?,
            port: parse_env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
