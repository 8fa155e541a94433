//! Configuration types for the content loader.
//!
//! Every duration the loader uses is a field here. The defaults reproduce the
//! behaviour the website ships with; a `loader.toml` file may override any of
//! them:
//!
//! ```toml
//! content_root = "/content"
//!
//! [cache]
//! collection_ttl_secs = 300
//! manifest_ttl_secs = 600
//!
//! [retry]
//! max_retries = 2
//! suppression_secs = 30
//!
//! [timeouts]
//! document_ms = 8000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ContentError;

/// Name of the configuration file looked up in the user config directory.
pub const CONFIG_FILE_NAME: &str = "loader.toml";

/// Cache expiry and error reporting windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub collection_ttl_secs: u64,
    pub manifest_ttl_secs: u64,
    pub document_ttl_secs: u64,
    /// Errors older than this are left out of `recent_errors()`.
    pub error_window_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            collection_ttl_secs: 5 * 60,
            manifest_ttl_secs: 10 * 60,
            document_ttl_secs: 5 * 60,
            error_window_secs: 60 * 60,
        }
    }
}

impl CacheConfig {
    pub fn collection_ttl(&self) -> Duration {
        Duration::from_secs(self.collection_ttl_secs)
    }

    pub fn manifest_ttl(&self) -> Duration {
        Duration::from_secs(self.manifest_ttl_secs)
    }

    pub fn document_ttl(&self) -> Duration {
        Duration::from_secs(self.document_ttl_secs)
    }

    pub fn error_window(&self) -> Duration {
        Duration::from_secs(self.error_window_secs)
    }
}

/// Retry and retry-suppression settings for document fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt (2 means three attempts in total).
    pub max_retries: u32,
    /// Delay before retry `n` is `base_delay_ms * n`.
    pub base_delay_ms: u64,
    /// A key that failed is not fetched again until this much time passed.
    pub suppression_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 1000,
            suppression_secs: 30,
        }
    }
}

impl RetryConfig {
    /// Backoff to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(u64::from(attempt)))
    }

    pub fn suppression(&self) -> Duration {
        Duration::from_secs(self.suppression_secs)
    }
}

/// Per call-site request deadlines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub default_ms: u64,
    pub manifest_ms: u64,
    pub document_ms: u64,
    /// Deadline for the whole health probe set.
    pub health_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_ms: 10_000,
            manifest_ms: 5_000,
            document_ms: 8_000,
            health_ms: 30_000,
        }
    }
}

impl TimeoutConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_ms)
    }

    pub fn manifest(&self) -> Duration {
        Duration::from_millis(self.manifest_ms)
    }

    pub fn document(&self) -> Duration {
        Duration::from_millis(self.document_ms)
    }

    pub fn health(&self) -> Duration {
        Duration::from_millis(self.health_ms)
    }
}

/// Complete loader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Path prefix under which `{type}/{lang}/...` content lives.
    pub content_root: String,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub timeouts: TimeoutConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            content_root: "/content".to_string(),
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

/// HTTP client configuration for the `teresita-client` HTTP source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Hard ceiling applied by the HTTP client itself, above the per-call
    /// deadlines of [`TimeoutConfig`].
    pub timeout: Duration,
}

impl HttpConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: format!("Teresita/{} (content-loader)", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Returns the default configuration file path
/// (`<config dir>/teresita/loader.toml`), if the platform has a config
/// directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("teresita").join(CONFIG_FILE_NAME))
}

/// Loads the loader configuration.
///
/// With an explicit `path` the file must exist. Without one, the default
/// path is tried and a missing file silently yields the defaults.
///
/// # Errors
///
/// Returns `ContentError::ConfigError` if the file cannot be read or is not
/// valid TOML for [`LoaderConfig`].
pub fn load_loader_config(path: Option<&Path>) -> Result<LoaderConfig, ContentError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => {
                tracing::debug!("No loader config file found, using defaults");
                return Ok(LoaderConfig::default());
            }
        },
    };

    let raw = std::fs::read_to_string(&path).map_err(|e| {
        ContentError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
    })?;

    let config: LoaderConfig = toml::from_str(&raw).map_err(|e| {
        ContentError::ConfigError(format!("Invalid TOML in {}: {}", path.display(), e))
    })?;

    tracing::debug!("Loaded loader config from {}", path.display());
    Ok(config)
}
