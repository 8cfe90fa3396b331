//! Client configuration with layered loading.
//!
//! Loading precedence (highest wins):
//! 1. Environment variables (`HUBFILE_*`, plus `GITHUB_TOKEN` as a token fallback)
//! 2. TOML file from `HUBFILE_CONFIG_FILE`, or `config.toml` in the platform config dir
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default cache lifetime for stored responses: 12 hours.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 12 * 60 * 60;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_COMMIT_MESSAGE: &str = "Updated via hubfile";

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

/// Repository, identity and cache settings for a [`GitHubClient`](crate::GitHubClient).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the REST API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Owner (user or organization) of the target repository.
    #[serde(default)]
    pub repository_owner: String,

    /// Name of the target repository.
    #[serde(default)]
    pub repository_name: String,

    /// Authenticated username, sent as the User-Agent.
    #[serde(default)]
    pub auth_username: String,

    /// Personal access token.
    #[serde(default)]
    pub auth_token: String,

    #[serde(default)]
    pub committer_name: String,

    #[serde(default)]
    pub committer_email: String,

    /// Commit author; falls back to the committer when unset.
    #[serde(default)]
    pub author_name: Option<String>,

    #[serde(default)]
    pub author_email: Option<String>,

    /// Message used for every commit created by this client.
    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    /// IANA zone name sent in the `Time-Zone` header.
    #[serde(default)]
    pub time_zone: Option<String>,

    /// Lifetime of a cached response before it counts as stale.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Revalidate entries that have not yet expired instead of serving them directly.
    #[serde(default = "default_true")]
    pub revalidate_fresh: bool,

    /// Transport timeout in milliseconds. Unset means the reqwest default.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.into()
}

fn default_commit_message() -> String {
    DEFAULT_COMMIT_MESSAGE.into()
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            repository_owner: String::new(),
            repository_name: String::new(),
            auth_username: String::new(),
            auth_token: String::new(),
            committer_name: String::new(),
            committer_email: String::new(),
            author_name: None,
            author_email: None,
            commit_message: default_commit_message(),
            time_zone: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            revalidate_fresh: true,
            timeout_ms: None,
        }
    }
}

/// Path of the default config file (`~/.config/hubfile/config.toml` on Linux).
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "hubfile").map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Config {
    /// Load configuration from all sources and validate it.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// The layered figment used by [`Config::load`].
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(path) = std::env::var("HUBFILE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(path));
        } else if let Some(path) = default_config_path() {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed("HUBFILE_").ignore(&["config_file"]))
    }

    /// Extract and validate a configuration from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let mut config: Self = figment
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        if config.auth_token.is_empty()
            && let Ok(token) = std::env::var("GITHUB_TOKEN")
        {
            config.auth_token = token;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check required fields and value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("repository_owner", &self.repository_owner),
            ("repository_name", &self.repository_name),
            ("auth_username", &self.auth_username),
            ("auth_token", &self.auth_token),
            ("committer_name", &self.committer_name),
            ("committer_email", &self.committer_email),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing {
                    field: field.into(),
                    hint: format!("Set HUBFILE_{} or add it to config.toml", field.to_uppercase()),
                });
            }
        }

        if !(self.api_base.starts_with("https://") || self.api_base.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                field: "api_base".into(),
                reason: "must be an http(s) URL".into(),
            });
        }

        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "cache_ttl_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.commit_message.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "commit_message".into(),
                reason: "must not be empty".into(),
            });
        }

        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Author name, defaulting to the committer.
    pub fn author_name(&self) -> &str {
        self.author_name.as_deref().unwrap_or(&self.committer_name)
    }

    /// Author email, defaulting to the committer.
    pub fn author_email(&self) -> &str {
        self.author_email.as_deref().unwrap_or(&self.committer_email)
    }

    /// Fully qualified repository name (`owner/name`).
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.repository_owner, self.repository_name)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        repository_owner: "octo".into(),
        repository_name: "notes".into(),
        auth_username: "octo".into(),
        auth_token: "secret-token".into(),
        committer_name: "Octo Cat".into(),
        committer_email: "octo@example.com".into(),
        ..Default::default()
    }
}
