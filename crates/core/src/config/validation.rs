//! Configuration validation rules.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

/// `reference` joined onto `origin` with any fragment dropped, the way asset
/// URLs are resolved at startup.
fn resolve_against(origin: &url::Url, reference: &str) -> Option<String> {
    let mut joined = origin.join(reference.trim()).ok()?;
    joined.set_fragment(None);
    Some(joined.into())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `cache_name` is empty
    /// - `origin` is not an http(s) URL
    /// - `core_assets` is empty or does not contain `offline_url`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.cache_name.trim().is_empty() {
            return Err(invalid("cache_name", "must not be empty"));
        }

        let origin = url::Url::parse(self.origin.trim()).map_err(|_| invalid("origin", "must be a valid URL"))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", "must be an http:// or https:// URL"));
        }

        if self.core_assets.is_empty() {
            return Err(invalid("core_assets", "must list at least the offline document"));
        }

        let offline = resolve_against(&origin, &self.offline_url)
            .ok_or_else(|| invalid("offline_url", "must be a path or URL under origin"))?;
        let mut assets = Vec::with_capacity(self.core_assets.len());
        for asset in &self.core_assets {
            assets.push(resolve_against(&origin, asset).ok_or_else(|| invalid("core_assets", "contains an invalid URL"))?);
        }
        if !assets.contains(&offline) {
            return Err(invalid("offline_url", "must be one of core_assets so it is cached at install"));
        }

        if self.unregister_on_boot {
            tracing::warn!(
                cache_name = %self.cache_name,
                "unregister_on_boot is set; the gateway will not intercept requests"
            );
        }

        Ok(())
    }
}
