pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{ExtensionSettings, ProductStats, StoredScanRecord};

pub use sqlite::SqliteStore;

pub trait Store: Send + Sync {
    // Scan records
    fn save_scan(&self, record: &StoredScanRecord) -> Result<String>;
    fn get_scan(&self, key: &str) -> Result<Option<StoredScanRecord>>;
    /// Newest first
    fn recent_scans(&self, limit: usize) -> Result<Vec<(String, StoredScanRecord)>>;
    fn scan_count(&self) -> Result<usize>;

    // Stats
    /// Add classified outcomes to the counters in one atomic step
    fn record_outcomes(&self, safe: u64, flagged: u64, at: DateTime<Utc>) -> Result<ProductStats>;
    fn get_stats(&self) -> Result<ProductStats>;
    fn reset_stats(&self) -> Result<()>;

    // Settings
    fn get_settings(&self) -> Result<ExtensionSettings>;
    fn save_settings(&self, settings: &ExtensionSettings) -> Result<()>;
}
