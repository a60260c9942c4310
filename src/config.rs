// src/config.rs

//! Application configuration structures and loading.
//!
//! Configuration is read from a TOML file and then overlaid with the
//! `OPENSEARCH_*` / `UNIVERSITY_PROVIDER_URL` environment variables, so a
//! deployment can keep credentials out of the file.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Document store connection settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Index names per resource kind
    #[serde(default)]
    pub indices: IndexNames,

    /// External university data provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Log filter settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration if a file exists at `path`.
    ///
    /// A missing file is `Ok(None)`. A file that exists but cannot be read
    /// or parsed is an error, never a silent fallback to defaults.
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path)
            .map(Some)
            .map_err(|e| AppError::config(format!("Failed to load {}: {e}", path.display())))
    }

    /// Overlay values from the process environment.
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Overlay values from an arbitrary lookup (the environment in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("OPENSEARCH_HOST") {
            self.store.host = host;
        }
        if let Some(user) = lookup("OPENSEARCH_USER") {
            self.store.username = Some(user);
        }
        if let Some(password) = lookup("OPENSEARCH_PASSWORD") {
            self.store.password = Some(password);
        }
        if let Some(verify) = lookup("OPENSEARCH_VERIFY_CERTS") {
            self.store.verify_certs = verify.eq_ignore_ascii_case("true");
        }
        if let Some(index) = lookup("OPENSEARCH_INDEX") {
            self.indices.items = index;
        }
        if let Some(url) = lookup("UNIVERSITY_PROVIDER_URL") {
            self.provider.base_url = url;
        }
        self
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.store.host.trim().is_empty() {
            return Err(AppError::validation("store.host is empty"));
        }
        Url::parse(&self.store.host)
            .map_err(|e| AppError::validation(format!("store.host is not a URL: {e}")))?;
        if self.store.timeout_secs == 0 {
            return Err(AppError::validation("store.timeout_secs must be > 0"));
        }
        if self.store.shards == 0 {
            return Err(AppError::validation("store.shards must be > 0"));
        }
        if self.indices.items.trim().is_empty() || self.indices.universities.trim().is_empty() {
            return Err(AppError::validation("index names must not be empty"));
        }
        if self.indices.items == self.indices.universities {
            return Err(AppError::validation(
                "items and universities must use different indices",
            ));
        }
        Url::parse(&self.provider.base_url)
            .map_err(|e| AppError::validation(format!("provider.base_url is not a URL: {e}")))?;
        if self.provider.timeout_secs == 0 {
            return Err(AppError::validation("provider.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Document store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the OpenSearch cluster
    #[serde(default = "defaults::host")]
    pub host: String,

    /// Basic auth user
    #[serde(default)]
    pub username: Option<String>,

    /// Basic auth password
    #[serde(default)]
    pub password: Option<String>,

    /// Verify TLS certificates of the cluster
    #[serde(default)]
    pub verify_certs: bool,

    /// Primary shards for newly created indices
    #[serde(default = "defaults::shards")]
    pub shards: u32,

    /// Replicas for newly created indices
    #[serde(default = "defaults::replicas")]
    pub replicas: u32,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            username: None,
            password: None,
            verify_certs: false,
            shards: defaults::shards(),
            replicas: defaults::replicas(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Index names per resource kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexNames {
    #[serde(default = "defaults::items_index")]
    pub items: String,

    #[serde(default = "defaults::universities_index")]
    pub universities: String,
}

impl Default for IndexNames {
    fn default() -> Self {
        Self {
            items: defaults::items_index(),
            universities: defaults::universities_index(),
        }
    }
}

/// External university provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Search endpoint; the country is appended as a `country` query parameter
    #[serde(default = "defaults::provider_url")]
    pub base_url: String,

    /// User-Agent header for provider requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::provider_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    pub fn host() -> String {
        "https://localhost:9200".into()
    }
    pub fn shards() -> u32 {
        1
    }
    pub fn replicas() -> u32 {
        1
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn items_index() -> String {
        "items".into()
    }
    pub fn universities_index() -> String {
        "universities".into()
    }
    pub fn provider_url() -> String {
        "http://universities.hipolabs.com/search".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; unisearch/0.1)".into()
    }
    pub fn log_level() -> String {
        "info".into()
    }
}
