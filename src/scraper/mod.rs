//! Product scraping from storefront pages.
//!
//! # Architecture
//!
//! ```text
//! PageSource (HTTP / Chrome) → HTML → PageScraper → ScrapeOutcome
//!                                   │ listing page without cards
//!                                   ▼
//!                 ListingObserver ← DOM snapshots (bounded)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use ecomguard::scraper::{PageScraper, ScrapeOutcome};
//!
//! let scraper = PageScraper::new(Platform::Amazon);
//! let document = dom::parse(&html);
//! match scraper.scrape(&document, &url) {
//!     ScrapeOutcome::Detail(product) => { /* one product */ }
//!     ScrapeOutcome::Listing(cards) => { /* tagged cards */ }
//!     ScrapeOutcome::Empty => { /* wait for the DOM to fill in */ }
//! }
//! ```

mod chrome;
mod config;
mod detail;
mod listing;
mod observer;
mod selectors;
mod source;

pub use chrome::ChromePageSource;
pub use config::ScraperConfig;
pub use listing::COMPLIANCE_ID_ATTR;
pub use observer::{ListingObserver, ObservedListing};
pub use selectors::{DetailSelectors, ListingSelectors, PlatformSelectors};
pub use source::{HttpPageSource, PageSource};

use kuchikiki::NodeRef;
use tracing::debug;
use url::Url;

use crate::dom;
use crate::domain::{ListingProduct, Platform, ScrapedProduct};

/// What a page yielded
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeOutcome {
    /// Single product page
    Detail(ScrapedProduct),
    /// Listing page with at least one card
    Listing(Vec<ListingProduct>),
    /// Listing page with no cards (yet)
    Empty,
}

/// Selector-driven scraper for one platform
#[derive(Debug, Clone, Copy)]
pub struct PageScraper {
    platform: Platform,
    selectors: &'static PlatformSelectors,
}

impl PageScraper {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            selectors: PlatformSelectors::for_platform(platform),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// A detail landmark selects detail mode
    pub fn is_detail_page(&self, document: &NodeRef) -> bool {
        self.selectors
            .detail
            .as_ref()
            .is_some_and(|detail| dom::select_first(document, detail.landmark).is_some())
    }

    /// Scrape the page in whichever mode its DOM calls for.
    ///
    /// Listing mode tags the cards in `document` with their ids.
    pub fn scrape(&self, document: &NodeRef, page_url: &Url) -> ScrapeOutcome {
        if let Some(detail) = self.selectors.detail.as_ref() {
            if dom::select_first(document, detail.landmark).is_some() {
                debug!("Detail page detected on {}", page_url);
                return ScrapeOutcome::Detail(detail::scrape_detail(document, detail, page_url));
            }
        }

        let cards = self.scrape_listing(document, page_url);
        if cards.is_empty() {
            ScrapeOutcome::Empty
        } else {
            debug!("Found {} listing cards on {}", cards.len(), page_url);
            ScrapeOutcome::Listing(cards)
        }
    }

    pub fn scrape_listing(&self, document: &NodeRef, page_url: &Url) -> Vec<ListingProduct> {
        listing::scrape_listing(document, &self.selectors.listing, page_url)
    }
}

/// Resolve a possibly relative href/src against the page URL
pub(crate) fn resolve_url(page_url: &Url, raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    page_url
        .join(raw)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://www.amazon.in/s?k=atta").unwrap()
    }

    #[test]
    fn test_detail_mode_selected_by_landmark() {
        let document = dom::parse(
            r#"<span id="productTitle">Atta</span>
               <div data-component-type="s-search-result"><h2><span>Other</span></h2></div>"#,
        );
        let scraper = PageScraper::new(Platform::Amazon);
        assert!(scraper.is_detail_page(&document));
        match scraper.scrape(&document, &url()) {
            ScrapeOutcome::Detail(product) => assert_eq!(product.title, "Atta"),
            other => panic!("expected detail, got {:?}", other),
        }
    }

    #[test]
    fn test_listing_mode_without_landmark() {
        let document = dom::parse(
            r#"<div data-component-type="s-search-result"><h2><a href="/dp/B1"><span>A</span></a></h2></div>"#,
        );
        match PageScraper::new(Platform::Amazon).scrape(&document, &url()) {
            ScrapeOutcome::Listing(cards) => assert_eq!(cards.len(), 1),
            other => panic!("expected listing, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_page() {
        let document = dom::parse("<div id='search'></div>");
        assert_eq!(
            PageScraper::new(Platform::Amazon).scrape(&document, &url()),
            ScrapeOutcome::Empty
        );
    }

    #[test]
    fn test_platform_without_detail_mode() {
        let document = dom::parse(r#"<span id="productTitle">Atta</span>"#);
        let scraper = PageScraper::new(Platform::Flipkart);
        assert!(!scraper.is_detail_page(&document));
        assert_eq!(scraper.scrape(&document, &url()), ScrapeOutcome::Empty);
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(resolve_url(&url(), "/dp/B1"), "https://www.amazon.in/dp/B1");
        assert_eq!(resolve_url(&url(), "https://cdn.example/x.jpg"), "https://cdn.example/x.jpg");
        assert_eq!(resolve_url(&url(), "  "), "");
    }
}
