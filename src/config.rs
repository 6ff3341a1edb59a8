use std::path::PathBuf;
use std::time::Duration;

use secrecy::Secret;
use serde::Deserialize;

pub const DEFAULT_API_BASE_URL: &str = "https://your-backend.render.com";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,

    // Credential storage
    pub store_path: PathBuf,
    pub store_key: Option<Secret<String>>,
}

impl Config {
    /// Builds a config pointing at `api_base_url` with every other value defaulted.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            store_path: default_store_path(),
            store_key: None,
        }
    }

    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("TKSCAN")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let api_base_url: String = config
            .get("api_base_url")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());

        if let Err(e) = url::Url::parse(&api_base_url) {
            return Err(config::ConfigError::Message(format!(
                "invalid api_base_url {:?}: {}",
                api_base_url, e
            )));
        }

        Ok(Self {
            api_base_url,
            request_timeout_secs: config
                .get("request_timeout_secs")
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),

            store_path: config
                .get::<String>("store_path")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_store_path()),
            store_key: config.get::<String>("store_key").ok().map(Secret::new),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tkscan")
        .join("credentials.json")
}
