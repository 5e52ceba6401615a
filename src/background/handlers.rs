use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::background::MessageHandler;
use crate::compliance::{classify_all, ComplianceService};
use crate::domain::{ListingProduct, ScrapedProduct};
use crate::relay::RelayResponse;
use crate::store::Store;

pub const INVALID_PRODUCT_DATA: &str = "Invalid product data received.";

/// Accepted `complianceChecker` payloads
#[derive(Debug)]
enum CheckRequest {
    Product(ScrapedProduct),
    Listing {
        products: Vec<ListingProduct>,
        platform: Option<String>,
    },
}

impl CheckRequest {
    fn parse(body: &Value) -> Result<Self, String> {
        let obj = body
            .as_object()
            .ok_or_else(|| "body is not an object".to_string())?;

        if let Some(product) = obj.get("product") {
            if !product.is_object() {
                return Err("product is not an object".into());
            }
            let product: ScrapedProduct =
                serde_json::from_value(product.clone()).map_err(|e| e.to_string())?;
            return Ok(CheckRequest::Product(product));
        }

        if let Some(products) = obj.get("products") {
            if !products.is_array() {
                return Err("products is not an array".into());
            }
            let products: Vec<ListingProduct> =
                serde_json::from_value(products.clone()).map_err(|e| e.to_string())?;
            let platform = obj.get("platform").and_then(Value::as_str).map(String::from);
            return Ok(CheckRequest::Listing { products, platform });
        }

        Err("neither product nor products present".into())
    }
}

/// Handler for `complianceChecker`: grades single products through the
/// compliance service and classifies listing batches locally. Every
/// outcome is added to the persistent stats.
pub struct ComplianceChecker {
    service: Arc<dyn ComplianceService>,
    store: Arc<dyn Store>,
}

impl ComplianceChecker {
    pub fn new(service: Arc<dyn ComplianceService>, store: Arc<dyn Store>) -> Self {
        Self { service, store }
    }

    fn record(&self, safe: u64, flagged: u64) {
        // Stats are best effort; the answer still goes out
        if let Err(e) = self.store.record_outcomes(safe, flagged, Utc::now()) {
            error!("Failed to update product stats: {}", e);
        }
    }
}

#[async_trait]
impl MessageHandler for ComplianceChecker {
    async fn handle(&self, body: &Value) -> RelayResponse {
        match CheckRequest::parse(body) {
            Ok(CheckRequest::Product(product)) => {
                let report = self.service.check(&product).await;
                if report.is_compliant() {
                    self.record(1, 0);
                } else {
                    self.record(0, 1);
                }
                info!(
                    "Checked '{}': {}%{}",
                    product.display_title(),
                    report.display_score(),
                    if report.fallback { " (fallback)" } else { "" }
                );
                RelayResponse::Report(report)
            }
            Ok(CheckRequest::Listing { products, platform }) => {
                let results = classify_all(&products);
                let safe = results.iter().filter(|v| v.is_compliant).count() as u64;
                let flagged = results.len() as u64 - safe;
                self.record(safe, flagged);
                info!(
                    "Classified {} products from {}: {} safe, {} flagged",
                    results.len(),
                    platform.as_deref().unwrap_or("unknown platform"),
                    safe,
                    flagged
                );
                RelayResponse::Results { results }
            }
            Err(reason) => {
                warn!("Rejected compliance request: {}", reason);
                RelayResponse::error(INVALID_PRODUCT_DATA)
            }
        }
    }
}
