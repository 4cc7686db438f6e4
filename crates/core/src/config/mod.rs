//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELTER_*)
//! 2. TOML config file (if SHELTER_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELTER_*)
/// 2. TOML config file (if SHELTER_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding every cache store.
    ///
    /// Set via SHELTER_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Generation identifier; names the current store.
    ///
    /// Bump it between deployments to invalidate everything cached before.
    /// Set via SHELTER_CACHE_NAME environment variable.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Origin that core assets and relative request paths resolve against.
    ///
    /// Set via SHELTER_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Paths fetched and stored at install. Must include `offline_url`.
    ///
    /// Set via SHELTER_CORE_ASSETS environment variable.
    #[serde(default = "default_core_assets")]
    pub core_assets: Vec<String>,

    /// Document served when neither network nor cache can answer.
    ///
    /// Set via SHELTER_OFFLINE_URL environment variable.
    #[serde(default = "default_offline_url")]
    pub offline_url: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SHELTER_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SHELTER_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SHELTER_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Unregister every gateway generation at startup instead of registering
    /// the configured one.
    ///
    /// Set via SHELTER_UNREGISTER_ON_BOOT environment variable.
    #[serde(default)]
    pub unregister_on_boot: bool,

    /// Chat assistant endpoint.
    ///
    /// Set via SHELTER_CHAT_API_URL environment variable.
    /// Required only when chat_ask tool is called.
    #[serde(default)]
    pub chat_api_url: Option<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shelter-cache.sqlite")
}

fn default_cache_name() -> String {
    "shelter-v1".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_core_assets() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/offline.html".into()]
}

fn default_offline_url() -> String {
    "/offline.html".into()
}

fn default_user_agent() -> String {
    "shelter/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_name: default_cache_name(),
            origin: default_origin(),
            core_assets: default_core_assets(),
            offline_url: default_offline_url(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            unregister_on_boot: false,
            chat_api_url: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELTER_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELTER_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Chat endpoint, checked only when the chat tool is used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the endpoint is not set.
    pub fn require_chat_api_url(&self) -> Result<&str, ConfigError> {
        self.chat_api_url.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "chat_api_url".into(),
            hint: "Set SHELTER_CHAT_API_URL environment variable".into(),
        })
    }
}
