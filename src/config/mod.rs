//! Configuration management for ecomguard.
//!
//! Configuration is read from `~/.config/ecomguard/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use crate::compliance::ApiConfig;
use crate::relay::RelayConfig;
use crate::scraper::ScraperConfig;
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub relay: RelayConfig,
    pub scraper: ScraperConfig,
    pub store: StoreConfig,
}

/// Persistence options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database path (default: `<data dir>/ecomguard/ecomguard.db`)
    pub path: Option<PathBuf>,
    /// Number of scan records kept; older records are evicted on insert
    pub max_scan_records: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_scan_records: 500,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/ecomguard/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("ecomguard").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# ecomguard configuration

[api]
# Set to false to classify locally without calling the scoring service
enabled = true

# Scoring endpoint; receives POST { "product": ... }
endpoint = "http://localhost:3000/check-product"

# Per-request timeout (milliseconds)
timeout_ms = 5000

# Additional attempts after the first failure
max_retries = 2

# Backoff before attempt n is (n - 1) * backoff_ms
backoff_ms = 1000

# Report returned when every attempt fails
[api.mock]
compliance_score = 85.0
recommendations = [
    "Ensure price is clearly visible",
    "Add country of origin information",
]

[[api.mock.issues]]
field = "price"
message = "Price display format needs improvement"

[relay]
# Both relay timeouts are raised to cover the scoring client's retries
# and backoff while [api] is enabled

# How long the background queue may take before the direct path is tried
primary_timeout_ms = 3000

# Timeout of the direct fallback path
fallback_timeout_ms = 2000

# Messages the background service queues before senders wait
queue_capacity = 100

[scraper]
# Run browser in headless mode (no visible window)
headless = true

# Page load timeout in seconds
timeout_secs = 30

# Wait time after page load for dynamic content (milliseconds)
wait_after_load_ms = 1000

# Listing pages without cards are re-checked on DOM changes, at most this often
max_observations = 8

# Give up waiting for listing cards after this long (milliseconds)
observe_window_ms = 10000

# How often the browser is polled for DOM changes (milliseconds)
poll_interval_ms = 500

[store]
# Scan records kept before the oldest are evicted
max_scan_records = 500
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
