use std::path::PathBuf;

use anyhow::{Context, Result};

/// Default per-key byte budget for the local store, sized like the browser
/// storage quota the app originally lived within.
pub const DEFAULT_STORE_BYTE_BUDGET: usize = 5 * 1024 * 1024;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub anthropic_api_key: String,
    pub data_dir: PathBuf,
    pub store_byte_budget: usize,
    pub sync_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            api_base_url: require_env("ZOGAK_API_BASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            data_dir: std::env::var("ZOGAK_DATA_DIR")
                .unwrap_or_else(|_| ".zogak".to_string())
                .into(),
            store_byte_budget: std::env::var("ZOGAK_STORE_BYTE_BUDGET")
                .unwrap_or_else(|_| DEFAULT_STORE_BYTE_BUDGET.to_string())
                .parse::<usize>()
                .context("ZOGAK_STORE_BYTE_BUDGET must be a byte count")?,
            sync_interval_secs: std::env::var("ZOGAK_SYNC_INTERVAL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .context("ZOGAK_SYNC_INTERVAL_SECS must be a number of seconds")?,
            request_timeout_secs: std::env::var("ZOGAK_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .context("ZOGAK_REQUEST_TIMEOUT_SECS must be a number of seconds")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
