use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Prefix for ids written to listing cards as `data-compliance-id`.
const ID_PREFIX: &str = "cg-";
const ID_HEX_LEN: usize = 12;

/// A product scraped from a detail page.
///
/// Every field is best-effort: a selector that matched nothing leaves the
/// field empty instead of failing the whole record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrapedProduct {
    pub product_url: String,
    pub title: String,
    pub price: String,
    pub images: Vec<String>,
    pub description: String,
    pub meta: BTreeMap<String, String>,
}

impl ScrapedProduct {
    pub fn new(product_url: impl Into<String>) -> Self {
        Self {
            product_url: product_url.into(),
            ..Default::default()
        }
    }

    /// The first (main) image, or an empty string
    pub fn primary_image(&self) -> &str {
        self.images.first().map(String::as_str).unwrap_or("")
    }

    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "(Untitled)"
        } else {
            self.title.trim()
        }
    }
}

/// A product card scraped from a listing/search page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingProduct {
    pub id: String,
    pub title: String,
    pub price: String,
    pub image: String,
    pub link: String,
}

impl ListingProduct {
    /// Deterministic card id derived from the outbound link
    pub fn id_for_link(link: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(link.as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("{}{}", ID_PREFIX, &digest[..ID_HEX_LEN])
    }

    /// Random card id for cards without a usable link
    pub fn random_id() -> String {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        format!("{}{}", ID_PREFIX, &uuid[..ID_HEX_LEN])
    }
}
