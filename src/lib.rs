//! # ecomguard
//!
//! Compliance checks for e-commerce product pages: scrape a listing or
//! product page, have the background side grade it, and render the verdict
//! back into the page.
//!
//! ## Architecture
//!
//! ```text
//! PageSource → Scraper → Relay → Background (classifier / scoring API) → Relay → Renderer
//!                                     │
//!                                     └→ Store (stats, scan records, settings)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # Scan a product page and open the annotated copy
//! ecomguard scan https://www.amazon.in/dp/B0DW4JNC4T --open
//!
//! # Scan a saved search page without touching the network
//! ecomguard scan https://www.amazon.in/s?k=atta --file search.html --out annotated.html
//!
//! # Counters and recent scans
//! ecomguard stats
//! ecomguard history --limit 5
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store,
/// compliance service, background service and relay.
pub mod app;

/// Background side of the relay.
///
/// - [`MessageRouter`](background::MessageRouter): named handlers
/// - [`ComplianceChecker`](background::ComplianceChecker): the `complianceChecker` handler
/// - [`BackgroundService`](background::BackgroundService): actor task answering relay messages
pub mod background;

/// Command-line interface using clap.
///
/// - `scan <url>` - Scan a page and write the annotated HTML
/// - `watch <url>` - Rescan on an interval until Ctrl-C
/// - `classify <file>` - Classify listing products from JSON
/// - `stats`, `history`, `settings`
pub mod cli;

/// Compliance judgments: the local presence classifier and the remote
/// scoring client with retries and mock fallback.
pub mod compliance;

/// Configuration loaded from `~/.config/ecomguard/config.toml`.
pub mod config;

/// The page-side pipeline and the navigation observer.
pub mod content;

pub mod dom;

/// Core domain models.
///
/// - [`ScrapedProduct`](domain::ScrapedProduct) / [`ListingProduct`](domain::ListingProduct)
/// - [`ComplianceReport`](domain::ComplianceReport): canonical graded result
/// - [`ProductStats`](domain::ProductStats), [`StoredScanRecord`](domain::StoredScanRecord)
/// - [`ExtensionSettings`](domain::ExtensionSettings)
pub mod domain;

/// Page-context to background messaging with timeout and fallback.
pub mod relay;

/// Widget and badge rendering into the page DOM.
pub mod render;

/// Product scraping from storefront pages.
///
/// Uses CSS selectors per platform, with HTTP or headless Chrome
/// (chromiumoxide) page sources.
pub mod scraper;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
