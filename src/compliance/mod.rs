//! Compliance judgments for scraped products.
//!
//! ```text
//! ScrapedProduct ─▶ RemoteComplianceClient ─▶ scoring API (retry, backoff)
//!                          │ exhausted
//!                          ▼
//!                     MockReport (fallback)
//!
//! [ListingProduct] ─▶ check_compliance (presence of title/price/image)
//! ```

pub mod classifier;
pub mod client;

pub use classifier::{check_compliance, classify_all, LocalComplianceService};
pub use client::{HttpScoringApi, RemoteComplianceClient, ScoringApi};

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{ComplianceReport, Issue, ScrapedProduct};

/// Source of compliance reports for detail-page products.
///
/// Implementations never fail: when no judgment can be obtained they
/// answer with a fallback report so the caller can always render one.
#[async_trait]
pub trait ComplianceService: Send + Sync {
    async fn check(&self, product: &ScrapedProduct) -> ComplianceReport;
}

/// Scoring service configuration, passed to the client at construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Call the scoring service (false = classify locally)
    pub enabled: bool,
    pub endpoint: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Attempts after the first one
    pub max_retries: u32,
    /// Linear backoff step in milliseconds
    pub backoff_ms: u64,
    pub mock: MockReport,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://localhost:3000/check-product".to_string(),
            timeout_ms: 5000,
            max_retries: 2,
            backoff_ms: 1000,
            mock: MockReport::default(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before the 1-based `attempt`: `(attempt - 1) * backoff`
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        Duration::from_millis(u64::from(attempt.saturating_sub(1)).saturating_mul(self.backoff_ms))
    }

    /// Longest time `check` can take before it settles on the mock report:
    /// every attempt timing out plus every backoff.
    pub fn worst_case(&self) -> Duration {
        let attempts = u64::from(self.total_attempts());
        let requests = self.timeout_ms.saturating_mul(attempts);
        // 0 + 1 + ... + (attempts - 1) backoff steps
        let steps = attempts.saturating_mul(attempts.saturating_sub(1)) / 2;
        Duration::from_millis(requests.saturating_add(self.backoff_ms.saturating_mul(steps)))
    }
}

/// Fixed report handed out when the scoring service cannot be reached.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MockReport {
    pub compliance_score: f64,
    pub issues: Vec<Issue>,
    pub recommendations: Vec<String>,
}

impl Default for MockReport {
    fn default() -> Self {
        Self {
            compliance_score: 85.0,
            issues: vec![Issue::warning(
                "price",
                "Price display format needs improvement",
            )],
            recommendations: vec![
                "Ensure price is clearly visible".to_string(),
                "Add country of origin information".to_string(),
            ],
        }
    }
}

impl MockReport {
    /// The mock report, marked as fallback and tagged with the product
    pub fn for_product(&self, product: &ScrapedProduct) -> ComplianceReport {
        ComplianceReport {
            compliance_score: self.compliance_score.clamp(0.0, 100.0),
            issues: self.issues.clone(),
            recommendations: self.recommendations.clone(),
            fallback: true,
            product_title: Some(product.title.clone()),
            product_price: Some(product.price.clone()),
        }
    }
}
