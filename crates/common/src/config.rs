//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

const DEFAULT_STORE_URL: &str = "http://localhost:5601";
const DEFAULT_MAX_RETRIES: u32 = 5;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the remote artifact store
    pub store_url: String,

    /// Store provider (kibana, mock)
    pub store_provider: String,

    /// Folder holding the local artifact tree and the alias registry
    pub root_path: PathBuf,

    /// Transient-failure retry policy of the HTTP client
    pub max_retries: u32,
    pub retry_backoff_ms: u64,

    /// Runtime configuration
    pub rust_log: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("store_url", &self.store_url)
            .field("store_provider", &self.store_provider)
            .field("root_path", &self.root_path)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let max_retries = match env::var("DASHVAULT_MAX_RETRIES") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("DASHVAULT_MAX_RETRIES must be an integer: {raw}"))?,
            Err(_) => DEFAULT_MAX_RETRIES,
        };

        let retry_backoff_ms = match env::var("DASHVAULT_RETRY_BACKOFF_MS") {
            Ok(raw) => raw.parse().map_err(|_| {
                anyhow::anyhow!("DASHVAULT_RETRY_BACKOFF_MS must be an integer: {raw}")
            })?,
            Err(_) => DEFAULT_RETRY_BACKOFF_MS,
        };

        let config = Self {
            store_url: env::var("DASHVAULT_STORE_URL")
                .unwrap_or_else(|_| DEFAULT_STORE_URL.to_string()),
            store_provider: env::var("DASHVAULT_STORE_PROVIDER")
                .unwrap_or_else(|_| "kibana".to_string()),
            root_path: env::var("DASHVAULT_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            max_retries,
            retry_backoff_ms,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "dashvault=info".to_string()),
        };

        Ok(config)
    }
}
