//! Injects compliance results back into the page DOM.
//!
//! Both renderers remove what they injected earlier before adding new
//! markup, so rendering the same page repeatedly leaves one widget and
//! one badge per card.

mod badge;
mod widget;

pub use badge::{render_badges, BADGE_CLASS};
pub use widget::{render_widget, widget_markup, Anchor, WIDGET_ID};

use kuchikiki::NodeRef;

use crate::dom;

pub(crate) const COMPLIANT_COLOR: &str = "#28a745";
pub(crate) const FLAGGED_COLOR: &str = "#dc3545";

pub(crate) fn palette(compliant: bool) -> (&'static str, &'static str) {
    if compliant {
        (COMPLIANT_COLOR, "✅")
    } else {
        (FLAGGED_COLOR, "❌")
    }
}

/// Turn rendered markup into a detached element node.
///
/// Markup is parsed as its own document and the element with `id` is
/// lifted out of it.
pub(crate) fn detached_element(markup: &str, selector: &str) -> Option<NodeRef> {
    let fragment = dom::parse(markup);
    let element = dom::select_first(&fragment, selector)?;
    let node = element.as_node().clone();
    node.detach();
    Some(node)
}
