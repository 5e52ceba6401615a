//! The page-side pipeline: frame check, platform detection, scrape,
//! relay, best-effort storage and rendering.
//!
//! ```text
//! Page ─▶ PageScraper ─┬─ Detail  ─▶ Relay ─▶ report ─▶ store + widget
//!                      ├─ Listing ─▶ Relay ─▶ verdicts ─▶ badges
//!                      └─ Empty   ─▶ ListingObserver ─▶ Listing
//! ```

pub mod navigation;
pub mod page;

pub use navigation::{NavigationEvent, NavigationObserver, Subscription, SubscriptionId};
pub use page::{FrameContext, Page};

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::app::Result;
use crate::dom;
use crate::domain::{
    ComplianceReport, ExtensionSettings, ListingProduct, ListingVerdict, Platform,
    ScrapedProduct, StoredScanRecord,
};
use crate::relay::{Relay, RelayMessage, RelayResponse};
use crate::render::{self, Anchor};
use crate::scraper::{ListingObserver, PageScraper, PageSource, ScrapeOutcome};
use crate::store::Store;

/// Result of one pass over a page
#[derive(Debug, Clone)]
pub struct PageScan {
    pub url: Url,
    pub platform: Option<Platform>,
    /// The document after tagging and rendering
    pub html: String,
    pub outcome: ScanOutcome,
}

#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// Not scanned at all
    Skipped(SkipReason),
    /// A listing page that never showed cards
    NoProducts,
    /// Neither transport answered
    NoResponse,
    /// The background side answered with an error
    Rejected(String),
    Detail {
        product: ScrapedProduct,
        report: ComplianceReport,
        anchor: Anchor,
        /// Storage key, when the record was saved
        record_key: Option<String>,
    },
    Listing {
        products: Vec<ListingProduct>,
        verdicts: Vec<ListingVerdict>,
        badges: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NestedFrame,
    UnsupportedSite,
}

impl PageScan {
    fn unchanged(page: Page, platform: Option<Platform>, outcome: ScanOutcome) -> Self {
        Self {
            url: page.url,
            platform,
            html: page.html,
            outcome,
        }
    }

    pub fn summary(&self) -> String {
        match &self.outcome {
            ScanOutcome::Skipped(SkipReason::NestedFrame) => "Skipped: nested frame".into(),
            ScanOutcome::Skipped(SkipReason::UnsupportedSite) => "Skipped: unsupported site".into(),
            ScanOutcome::NoProducts => "No products found".into(),
            ScanOutcome::NoResponse => "No response from the compliance checker".into(),
            ScanOutcome::Rejected(error) => format!("Rejected: {}", error),
            ScanOutcome::Detail { product, report, .. } => format!(
                "{} {} - Compliance Score: {}%{}",
                if report.is_compliant() { "✅" } else { "❌" },
                product.display_title(),
                report.display_score(),
                if report.fallback { " (fallback)" } else { "" }
            ),
            ScanOutcome::Listing { verdicts, .. } => {
                let safe = verdicts.iter().filter(|v| v.is_compliant).count();
                format!(
                    "{} products: {} compliant, {} flagged",
                    verdicts.len(),
                    safe,
                    verdicts.len() - safe
                )
            }
        }
    }
}

pub struct ContentScript {
    relay: Arc<Relay>,
    store: Arc<dyn Store>,
    observer: ListingObserver,
}

impl ContentScript {
    pub fn new(relay: Arc<Relay>, store: Arc<dyn Store>, observer: ListingObserver) -> Self {
        Self {
            relay,
            store,
            observer,
        }
    }

    /// Run the pipeline over a loaded page.
    ///
    /// `mutations` feeds the listing observer when the page has no cards
    /// yet. Failures along the way end up in the outcome, never as errors.
    pub async fn run(
        &self,
        page: Page,
        mutations: Option<mpsc::Receiver<String>>,
        settings: &ExtensionSettings,
    ) -> PageScan {
        match prepare(page) {
            Ok(scraped) => self.check(scraped, mutations, settings).await,
            Err(scan) => scan,
        }
    }

    /// Load `url` from `source` and run the pipeline over it.
    pub async fn scan_url(
        &self,
        source: &dyn PageSource,
        url: &Url,
        settings: &ExtensionSettings,
    ) -> Result<PageScan> {
        let html = source.load(url).await?;
        let scraped = match prepare(Page::new(url.clone(), html)) {
            Ok(scraped) => scraped,
            Err(scan) => return Ok(scan),
        };

        // Only pages without cards need a live view
        let mutations = if matches!(scraped.outcome, ScrapeOutcome::Empty) {
            source.observe(url).await.unwrap_or_else(|e| {
                warn!("Cannot observe {}: {}", url, e);
                None
            })
        } else {
            None
        };

        Ok(self.check(scraped, mutations, settings).await)
    }

    async fn check(
        &self,
        scraped: ScrapedPage,
        mutations: Option<mpsc::Receiver<String>>,
        settings: &ExtensionSettings,
    ) -> PageScan {
        let ScrapedPage {
            page,
            platform,
            outcome,
        } = scraped;

        match outcome {
            ScrapeOutcome::Detail(product) => self.check_detail(page, platform, product, settings).await,
            ScrapeOutcome::Listing(products) => self.check_listing(page, platform, products).await,
            ScrapeOutcome::Empty => {
                let Some(mutations) = mutations else {
                    info!("No products found on {}", page.url);
                    return PageScan::unchanged(page, Some(platform), ScanOutcome::NoProducts);
                };

                let observed = self
                    .observer
                    .wait_for_listing(&PageScraper::new(platform), &page.url, mutations)
                    .await;
                match observed {
                    Some(observed) => {
                        let page = Page {
                            html: observed.html,
                            ..page
                        };
                        self.check_listing(page, platform, observed.products).await
                    }
                    None => PageScan::unchanged(page, Some(platform), ScanOutcome::NoProducts),
                }
            }
        }
    }

    /// Scan `url`, then rescan on every navigation event until `shutdown`
    /// resolves.
    pub async fn watch<F>(
        &self,
        source: &dyn PageSource,
        url: Url,
        navigation: &NavigationObserver,
        settings: &ExtensionSettings,
        shutdown: F,
        mut on_scan: impl FnMut(&PageScan),
    ) -> Result<usize>
    where
        F: Future<Output = ()>,
    {
        let mut subscription = navigation.subscribe();
        let mut location = url;
        let mut scans = 0;

        tokio::pin!(shutdown);

        let first = self.scan_url(source, &location, settings).await?;
        on_scan(&first);
        scans += 1;

        loop {
            let event = tokio::select! {
                _ = &mut shutdown => break,
                event = subscription.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            match event {
                NavigationEvent::PushState(url) | NavigationEvent::PopState(url) => {
                    info!("Navigated to {}", url);
                    location = url;
                }
                NavigationEvent::Rescan => debug!("Rescan requested for {}", location),
            }

            match self.scan_url(source, &location, settings).await {
                Ok(scan) => {
                    on_scan(&scan);
                    scans += 1;
                }
                Err(e) => warn!("Rescan of {} failed: {}", location, e),
            }
        }

        navigation.unsubscribe(subscription.id());
        Ok(scans)
    }

    async fn check_detail(
        &self,
        page: Page,
        platform: Platform,
        product: ScrapedProduct,
        settings: &ExtensionSettings,
    ) -> PageScan {
        let message = match RelayMessage::check_product(&product) {
            Ok(message) => message,
            Err(e) => {
                error!("Cannot encode product from {}: {}", page.url, e);
                return PageScan::unchanged(page, Some(platform), ScanOutcome::Rejected(e.to_string()));
            }
        };

        let report = match self.relay.send(&message).await {
            Some(RelayResponse::Report(report)) => report,
            Some(RelayResponse::Error { error }) => {
                warn!("Compliance check rejected: {}", error);
                return PageScan::unchanged(page, Some(platform), ScanOutcome::Rejected(error));
            }
            Some(RelayResponse::Results { .. }) => {
                warn!("Got listing results for a detail page");
                return PageScan::unchanged(
                    page,
                    Some(platform),
                    ScanOutcome::Rejected("unexpected listing results".into()),
                );
            }
            None => {
                error!("No response from background for {}", page.url);
                return PageScan::unchanged(page, Some(platform), ScanOutcome::NoResponse);
            }
        };

        let record = StoredScanRecord::new(product.clone(), report.clone(), &page.url);
        let record_key = match self.store.save_scan(&record) {
            Ok(key) => Some(key),
            Err(e) => {
                error!("Storage failed, continuing without it: {}", e);
                None
            }
        };

        let (anchor, html) = render_detail(&page.html, &report, settings.show_warnings);

        PageScan {
            url: page.url,
            platform: Some(platform),
            html,
            outcome: ScanOutcome::Detail {
                product,
                report,
                anchor,
                record_key,
            },
        }
    }

    async fn check_listing(
        &self,
        page: Page,
        platform: Platform,
        products: Vec<ListingProduct>,
    ) -> PageScan {
        let message = match RelayMessage::check_listing(&products, platform) {
            Ok(message) => message,
            Err(e) => {
                error!("Cannot encode listing from {}: {}", page.url, e);
                return PageScan::unchanged(page, Some(platform), ScanOutcome::Rejected(e.to_string()));
            }
        };

        let verdicts = match self.relay.send(&message).await {
            Some(RelayResponse::Results { results }) => results,
            Some(RelayResponse::Error { error }) => {
                warn!("Listing check rejected: {}", error);
                return PageScan::unchanged(page, Some(platform), ScanOutcome::Rejected(error));
            }
            Some(RelayResponse::Report(_)) => {
                warn!("Got a single report for a listing page");
                return PageScan::unchanged(
                    page,
                    Some(platform),
                    ScanOutcome::Rejected("unexpected single report".into()),
                );
            }
            None => {
                error!("No response from background for {}", page.url);
                return PageScan::unchanged(page, Some(platform), ScanOutcome::NoResponse);
            }
        };

        let (badges, html) = render_listing(&page.html, &products, &verdicts);

        PageScan {
            url: page.url,
            platform: Some(platform),
            html,
            outcome: ScanOutcome::Listing {
                products,
                verdicts,
                badges,
            },
        }
    }
}

/// A page that passed the frame and platform checks, scraped once
struct ScrapedPage {
    /// HTML carries the card ids written while scraping
    page: Page,
    platform: Platform,
    outcome: ScrapeOutcome,
}

/// Frame check, platform detection and the scrape. Pages that are not
/// scanned come back as a finished `PageScan`.
fn prepare(page: Page) -> std::result::Result<ScrapedPage, PageScan> {
    if !page.frame.should_run() {
        debug!("Running in a nested frame, skipping {}", page.url);
        return Err(PageScan::unchanged(page, None, ScanOutcome::Skipped(SkipReason::NestedFrame)));
    }

    let Some(platform) = Platform::from_url(&page.url) else {
        debug!("No scraper for {}", page.url);
        return Err(PageScan::unchanged(
            page,
            None,
            ScanOutcome::Skipped(SkipReason::UnsupportedSite),
        ));
    };

    let document = dom::parse(&page.html);
    let outcome = PageScraper::new(platform).scrape(&document, &page.url);
    let html = dom::serialize(&document);

    Ok(ScrapedPage {
        page: Page { html, ..page },
        platform,
        outcome,
    })
}

fn render_detail(html: &str, report: &ComplianceReport, show_warnings: bool) -> (Anchor, String) {
    let document = dom::parse(html);
    let anchor = render::render_widget(&document, report, show_warnings);
    (anchor, dom::serialize(&document))
}

fn render_listing(
    html: &str,
    products: &[ListingProduct],
    verdicts: &[ListingVerdict],
) -> (usize, String) {
    let document = dom::parse(html);
    let badges = render::render_badges(&document, products, verdicts);
    (badges, dom::serialize(&document))
}
