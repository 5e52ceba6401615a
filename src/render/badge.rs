use kuchikiki::NodeRef;
use maud::html;
use tracing::{debug, warn};

use crate::dom;
use crate::domain::{ListingProduct, ListingVerdict};
use crate::render::{detached_element, palette};
use crate::scraper::COMPLIANCE_ID_ATTR;

pub const BADGE_CLASS: &str = "compliance-badge";

/// Badge each listing card with its verdict.
///
/// Verdicts pair with `products` by position, as the batch classifier
/// returns them. Returns the number of badges placed.
pub fn render_badges(
    document: &NodeRef,
    products: &[ListingProduct],
    verdicts: &[ListingVerdict],
) -> usize {
    if products.len() != verdicts.len() {
        warn!(
            "Got {} verdicts for {} products; badging the overlap",
            verdicts.len(),
            products.len()
        );
    }

    let selector = format!(".{}", BADGE_CLASS);
    let mut placed = 0;

    for (product, verdict) in products.iter().zip(verdicts) {
        if verdict.link != product.link {
            debug!("Verdict link {} does not match card {}", verdict.link, product.id);
            continue;
        }

        let Some(card) = dom::select_first(
            document,
            &format!("[{}=\"{}\"]", COMPLIANCE_ID_ATTR, product.id),
        ) else {
            debug!("Card {} is gone from the page", product.id);
            continue;
        };

        dom::remove_all(card.as_node(), &selector);
        ensure_positioned(&card);

        let Some(badge) = detached_element(&badge_markup(verdict), &selector) else {
            continue;
        };
        card.as_node().append(badge);
        placed += 1;
    }

    placed
}

fn badge_markup(verdict: &ListingVerdict) -> String {
    let (color, icon) = palette(verdict.is_compliant);
    let label = if verdict.is_compliant { "Compliant" } else { "Non-compliant" };
    let tooltip = if verdict.reasons.is_empty() {
        "All required fields present".to_string()
    } else {
        verdict.reasons.join("\n")
    };

    html! {
        span class=(BADGE_CLASS) title=(tooltip) style={
            "position: absolute; top: 8px; right: 8px; z-index: 10000; "
            "padding: 2px 6px; border-radius: 4px; font: 600 11px Arial, sans-serif; "
            "color: #fff; background-color: " (color) ";"
        } {
            (icon) " " (label)
        }
    }
    .into_string()
}

/// Absolute badges need a positioned card
fn ensure_positioned(card: &dom::Element) {
    let style = dom::attr(card, "style").unwrap_or_default();
    if has_position(&style) {
        return;
    }

    let style = if style.is_empty() {
        "position: relative;".to_string()
    } else if style.ends_with(';') {
        format!("{} position: relative;", style)
    } else {
        format!("{}; position: relative;", style)
    };
    dom::set_attr(card, "style", &style);
}

/// True when an inline style declares `position` itself, not a
/// `*-position` property.
fn has_position(style: &str) -> bool {
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .any(|(prop, _)| prop.trim().eq_ignore_ascii_case("position"))
}
