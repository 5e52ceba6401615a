use serde::{Deserialize, Serialize};

use crate::app::{GuardError, Result};

/// Storage key of the user settings
pub const SETTINGS_KEY: &str = "extensionSettings";

pub const MIN_SCAN_INTERVAL: u64 = 10;
pub const MAX_SCAN_INTERVAL: u64 = 300;
const SCAN_INTERVAL_STEP: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtensionSettings {
    /// Rescan automatically while watching a page
    pub auto_scan: bool,
    /// Print a summary line after each scan
    pub notifications: bool,
    /// Seconds between automatic rescans
    pub scan_interval: u64,
    /// Include the issue list in rendered widgets
    pub show_warnings: bool,
}

impl Default for ExtensionSettings {
    fn default() -> Self {
        Self {
            auto_scan: false,
            notifications: true,
            scan_interval: 30,
            show_warnings: true,
        }
    }
}

impl ExtensionSettings {
    /// Update one setting from its storage name (`autoScan`, ...) or the
    /// snake_case spelling.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "autoScan" | "auto_scan" => self.auto_scan = parse_bool(key, value)?,
            "notifications" => self.notifications = parse_bool(key, value)?,
            "showWarnings" | "show_warnings" => self.show_warnings = parse_bool(key, value)?,
            "scanInterval" | "scan_interval" => {
                let secs = value.trim().parse::<u64>().map_err(|_| {
                    GuardError::Config(format!("{} expects a number of seconds, got {:?}", key, value))
                })?;
                if !(MIN_SCAN_INTERVAL..=MAX_SCAN_INTERVAL).contains(&secs)
                    || secs % SCAN_INTERVAL_STEP != 0
                {
                    return Err(GuardError::Config(format!(
                        "scanInterval must be {}..={} in steps of {}",
                        MIN_SCAN_INTERVAL, MAX_SCAN_INTERVAL, SCAN_INTERVAL_STEP
                    )));
                }
                self.scan_interval = secs;
            }
            _ => return Err(GuardError::Config(format!("Unknown setting: {}", key))),
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(GuardError::Config(format!(
            "{} expects true/false, got {:?}",
            key, value
        ))),
    }
}
