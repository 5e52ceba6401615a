//! Thin helpers over `kuchikiki` shared by the scraper and the renderer.

use kuchikiki::traits::TendrilSink;
use kuchikiki::{ElementData, NodeDataRef, NodeRef};
use tracing::warn;

pub type Element = NodeDataRef<ElementData>;

pub fn parse(html: &str) -> NodeRef {
    kuchikiki::parse_html().one(html)
}

pub fn serialize(document: &NodeRef) -> String {
    document.to_string()
}

/// All descendants of `node` matching `selector`, in document order.
///
/// An unparsable selector matches nothing.
pub fn select_all(node: &NodeRef, selector: &str) -> Vec<Element> {
    match node.select(selector) {
        Ok(matches) => matches.collect(),
        Err(()) => {
            warn!("Invalid CSS selector: {}", selector);
            Vec::new()
        }
    }
}

pub fn select_first(node: &NodeRef, selector: &str) -> Option<Element> {
    node.select_first(selector).ok()
}

/// Text content with whitespace runs collapsed and ends trimmed
pub fn text(element: &Element) -> String {
    element
        .as_node()
        .text_contents()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn attr(element: &Element, name: &str) -> Option<String> {
    element
        .attributes
        .borrow()
        .get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn set_attr(element: &Element, name: &str, value: &str) {
    element
        .attributes
        .borrow_mut()
        .insert(name, value.to_string());
}

/// Detach every element matching `selector`; returns how many were removed
pub fn remove_all(node: &NodeRef, selector: &str) -> usize {
    let matches = select_all(node, selector);
    let count = matches.len();
    for element in matches {
        element.as_node().detach();
    }
    count
}
