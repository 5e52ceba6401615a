use std::collections::HashSet;

use kuchikiki::NodeRef;
use url::Url;

use crate::dom;
use crate::domain::ListingProduct;
use crate::scraper::resolve_url;
use crate::scraper::selectors::ListingSelectors;

/// Attribute tying a listing card to its asynchronous verdict
pub const COMPLIANCE_ID_ATTR: &str = "data-compliance-id";

/// Scrape every listing card and tag it with a locally-unique id.
///
/// Cards already carrying an id keep it, so rescans of the same DOM line
/// up with earlier results.
pub fn scrape_listing(document: &NodeRef, selectors: &ListingSelectors, page_url: &Url) -> Vec<ListingProduct> {
    let mut seen = HashSet::new();

    dom::select_all(document, selectors.card)
        .into_iter()
        .map(|card| {
            let node = card.as_node();

            let title = dom::select_first(node, selectors.title)
                .map(|el| dom::text(&el))
                .unwrap_or_default();

            let price = dom::select_first(node, selectors.price)
                .map(|el| dom::text(&el))
                .unwrap_or_default();

            let image = dom::select_first(node, selectors.image)
                .and_then(|el| dom::attr(&el, "src").or_else(|| dom::attr(&el, "data-src")))
                .map(|src| resolve_url(page_url, &src))
                .unwrap_or_default();

            let link = dom::select_first(node, selectors.link)
                .and_then(|el| dom::attr(&el, "href"))
                .map(|href| resolve_url(page_url, &href))
                .unwrap_or_default();

            let base_id = dom::attr(&card, COMPLIANCE_ID_ATTR).unwrap_or_else(|| {
                if link.is_empty() {
                    ListingProduct::random_id()
                } else {
                    ListingProduct::id_for_link(&link)
                }
            });
            let id = unique_id(base_id, &mut seen);
            dom::set_attr(&card, COMPLIANCE_ID_ATTR, &id);

            ListingProduct {
                id,
                title,
                price,
                image,
                link,
            }
        })
        .collect()
}

/// Cards sharing a link get `-2`, `-3`, ... suffixes
fn unique_id(base: String, seen: &mut HashSet<String>) -> String {
    if seen.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
