// model-registry/src/config.rs

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

pub const DEFAULT_MODELS_CONFIG: &str = "models/models.json";
pub const DEFAULT_ADAPTERS_DIR: &str = "adapters";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    /// JSON file declaring the served models.
    pub models_config: PathBuf,
    /// Directory searched for adapter libraries not compiled into the binary.
    pub adapters_dir: PathBuf,
    /// `auto` probes for an accelerator; anything else is passed to adapters as-is.
    pub device: String,
    pub request_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_host: "127.0.0.1".to_string(),
            api_port: 5000,
            models_config: PathBuf::from(DEFAULT_MODELS_CONFIG),
            adapters_dir: PathBuf::from(DEFAULT_ADAPTERS_DIR),
            device: "auto".to_string(),
            request_timeout_seconds: 600,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("Failed to load .env file: {}. Using system environment variables.", e);
        } else {
            info!("Loaded environment variables from .env file");
        }

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str, default: String| lookup(key).unwrap_or(default);

        let api_port = var("API_PORT", defaults.api_port.to_string());
        let timeout = var(
            "REQUEST_TIMEOUT_SECONDS",
            defaults.request_timeout_seconds.to_string(),
        );

        Ok(Self {
            api_host: var("API_HOST", defaults.api_host),
            api_port: api_port
                .parse()
                .with_context(|| format!("API_PORT is not a valid port: {}", api_port))?,
            models_config: PathBuf::from(var(
                "MODELS_CONFIG",
                defaults.models_config.to_string_lossy().into_owned(),
            )),
            adapters_dir: PathBuf::from(var(
                "ADAPTERS_DIR",
                defaults.adapters_dir.to_string_lossy().into_owned(),
            )),
            device: var("DEVICE", defaults.device),
            request_timeout_seconds: timeout.parse().with_context(|| {
                format!("REQUEST_TIMEOUT_SECONDS is not a number: {}", timeout)
            })?,
        })
    }

    pub fn print_config(&self) {
        info!("Current Configuration:");
        info!("- API: {}:{}", self.api_host, self.api_port);
        info!("- Models Config: {}", self.models_config.display());
        info!("- Adapters Dir: {}", self.adapters_dir.display());
        info!("- Device: {}", self.device);
        info!("- Request Timeout: {}s", self.request_timeout_seconds);
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}
