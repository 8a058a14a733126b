//! Runtime settings for the fetch wrapper, cache and GitHub importer.
//!
//! Values are merged by figment from built-in defaults, an optional TOML
//! file and `PRESETSYNC_*` environment variables, then validated.

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// presetsync settings.
///
/// Environment beats the TOML file, which beats the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// GitHub personal access token attached to authenticated requests.
    ///
    /// Set via PRESETSYNC_GITHUB_TOKEN environment variable.
    #[serde(default)]
    pub github_token: Option<String>,

    /// Base URL of the GitHub REST API.
    ///
    /// Set via PRESETSYNC_GITHUB_API_URL environment variable.
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// Repository directory searched for preset files.
    ///
    /// Set via PRESETSYNC_PRESETS_PATH environment variable.
    #[serde(default = "default_presets_path")]
    pub presets_path: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via PRESETSYNC_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via PRESETSYNC_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of cached responses.
    ///
    /// Set via PRESETSYNC_CACHE_MAX_ENTRIES environment variable.
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// TTL for cached responses when a request sets none, in milliseconds.
    ///
    /// Set via PRESETSYNC_DEFAULT_TTL_MS environment variable.
    #[serde(default = "default_ttl_ms")]
    pub default_ttl_ms: u64,
}

fn default_github_api_url() -> String {
    "https://api.github.com".into()
}

fn default_presets_path() -> String {
    "presets".into()
}

fn default_user_agent() -> String {
    "presetsync/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_cache_max_entries() -> usize {
    100
}

fn default_ttl_ms() -> u64 {
    300_000 // 5 minutes
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            github_api_url: default_github_api_url(),
            presets_path: default_presets_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            cache_max_entries: default_cache_max_entries(),
            default_ttl_ms: default_ttl_ms(),
        }
    }
}

impl AppConfig {
    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Default cache TTL as Duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    /// Merge defaults, the file named by `PRESETSYNC_CONFIG_FILE` and
    /// `PRESETSYNC_*` variables, then validate the result.
    ///
    /// # Errors
    ///
    /// `ConfigError::LoadFailed` when a source cannot be read or a value has
    /// the wrong type; `ConfigError::Invalid` when validation rejects it.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("PRESETSYNC_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("PRESETSYNC_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The GitHub token, if one is configured and non-empty.
    pub fn github_token(&self) -> Option<&str> {
        self.github_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Check if a GitHub token is available (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no token is set.
    pub fn require_github_token(&self) -> Result<&str, ConfigError> {
        self.github_token().ok_or_else(|| ConfigError::Missing {
            field: "github_token".into(),
            hint: "Set PRESETSYNC_GITHUB_TOKEN environment variable".into(),
        })
    }
}
