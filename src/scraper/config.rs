use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for page loading and listing observation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Page load timeout in seconds (default: 30)
    pub timeout_secs: u64,

    /// Wait time after page load for dynamic content in milliseconds (default: 1000)
    pub wait_after_load_ms: u64,

    /// Maximum DOM observations while waiting for listing cards (default: 8)
    pub max_observations: usize,

    /// Overall window for listing observation in milliseconds (default: 10000)
    pub observe_window_ms: u64,

    /// Interval between DOM snapshots of a live page in milliseconds (default: 500)
    pub poll_interval_ms: u64,

    /// Maximum concurrent browser pages (default: 2)
    pub max_concurrency: usize,

    /// User agent string to use
    pub user_agent: Option<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_secs: 30,
            wait_after_load_ms: 1000,
            max_observations: 8,
            observe_window_ms: 10_000,
            poll_interval_ms: 500,
            max_concurrency: 2,
            user_agent: Some(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
        }
    }
}

impl ScraperConfig {
    /// Get the page load timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the wait time after load as a Duration
    pub fn wait_after_load(&self) -> Duration {
        Duration::from_millis(self.wait_after_load_ms)
    }

    pub fn observe_window(&self) -> Duration {
        Duration::from_millis(self.observe_window_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
