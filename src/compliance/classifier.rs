use async_trait::async_trait;

use crate::compliance::ComplianceService;
use crate::domain::{ComplianceReport, ListingProduct, ListingVerdict, ScrapedProduct};

pub const MISSING_TITLE: &str = "Missing product title.";
pub const MISSING_PRICE: &str = "Missing MRP.";
pub const MISSING_IMAGE: &str = "Missing product image.";

/// Presence check of the required listing fields.
///
/// Reasons come out in title, price, image order; the verdict is
/// compliant iff there are none.
pub fn check_compliance(product: &ListingProduct) -> ListingVerdict {
    let reasons = missing_fields(&product.title, &product.price, &product.image);

    ListingVerdict {
        link: product.link.clone(),
        is_compliant: reasons.is_empty(),
        reasons,
    }
}

pub fn classify_all(products: &[ListingProduct]) -> Vec<ListingVerdict> {
    products.iter().map(check_compliance).collect()
}

fn missing_fields(title: &str, price: &str, image: &str) -> Vec<String> {
    [(title, MISSING_TITLE), (price, MISSING_PRICE), (image, MISSING_IMAGE)]
        .into_iter()
        .filter(|(value, _)| value.trim().is_empty())
        .map(|(_, reason)| reason.to_string())
        .collect()
}

/// Classifies detail products with the presence check, without any
/// network access.
#[derive(Debug, Clone, Default)]
pub struct LocalComplianceService;

#[async_trait]
impl ComplianceService for LocalComplianceService {
    async fn check(&self, product: &ScrapedProduct) -> ComplianceReport {
        let reasons = missing_fields(&product.title, &product.price, product.primary_image());
        let mut report = ListingVerdict {
            link: product.product_url.clone(),
            is_compliant: reasons.is_empty(),
            reasons,
        }
        .into_report();
        report.product_title = Some(product.title.clone());
        report.product_price = Some(product.price.clone());
        report
    }
}
