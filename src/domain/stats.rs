use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::{ComplianceReport, ScrapedProduct};

/// Storage key of the running scan counters
pub const STATS_KEY: &str = "productStats";

/// Prefix of per-scan record keys: `compliance_<hostname>_<epoch-ms>`
pub const SCAN_KEY_PREFIX: &str = "compliance_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    pub total_scanned: u64,
    pub safe_products: u64,
    pub flagged_products: u64,
    pub last_scan_time: Option<DateTime<Utc>>,
}

impl ProductStats {
    pub fn is_consistent(&self) -> bool {
        self.total_scanned == self.safe_products + self.flagged_products
    }
}

/// One detail-page scan as persisted for the summary views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredScanRecord {
    pub product: ScrapedProduct,
    pub result: ComplianceReport,
    /// Epoch milliseconds
    pub timestamp: i64,
    pub url: String,
}

impl StoredScanRecord {
    pub fn new(product: ScrapedProduct, result: ComplianceReport, url: &Url) -> Self {
        Self {
            product,
            result,
            timestamp: Utc::now().timestamp_millis(),
            url: url.to_string(),
        }
    }

    pub fn hostname(&self) -> String {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(String::from))
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn storage_key(&self) -> String {
        Self::key_for(&self.hostname(), self.timestamp)
    }

    pub fn key_for(hostname: &str, timestamp: i64) -> String {
        format!("{}{}_{}", SCAN_KEY_PREFIX, hostname, timestamp)
    }

    pub fn scanned_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}
