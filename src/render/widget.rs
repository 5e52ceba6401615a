use kuchikiki::NodeRef;
use maud::{html, Markup};
use tracing::{debug, warn};

use crate::dom;
use crate::domain::ComplianceReport;
use crate::render::{detached_element, palette};

pub const WIDGET_ID: &str = "compliance-widget-container";

const FALLBACK_NOTE: &str =
    "Compliance service unavailable. Showing estimated results.";

/// Where the widget ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Prepended to `#corePrice_feature_div` or `#price`
    PriceBlock,
    /// Appended to the parent of `#productTitle`
    TitleParent,
    /// Inserted before `#feature-bullets`
    FeatureBullets,
    Body,
    DocumentRoot,
}

pub fn widget_markup(report: &ComplianceReport, show_warnings: bool) -> Markup {
    let (color, icon) = palette(report.is_compliant());
    let background = if report.is_compliant() { "#f6fff8" } else { "#fff8f8" };

    html! {
        div id=(WIDGET_ID) style={
            "border: 2px solid " (color) "; border-radius: 8px; padding: 16px; margin: 16px 0; "
            "background-color: " (background) "; font-family: Arial, sans-serif; "
            "z-index: 10000; position: relative;"
        } {
            div style={
                "display: flex; align-items: center; gap: 12px; font-size: 16px; "
                "font-weight: 700; color: " (color) ";"
            } {
                span style="font-size: 24px;" { (icon) }
                div {
                    div { "Compliance Score: " (report.display_score()) "%" }
                    div style="font-size: 12px; font-weight: 400; color: #555;" {
                        "Verified by E-Commerce Guard"
                    }
                }
            }
            @if show_warnings && !report.issues.is_empty() {
                div .compliance-issues style="margin-top: 12px;" {
                    div style="font-weight: 600; color: #dc3545; font-size: 14px;" { "Issues Found:" }
                    ul style="margin: 6px 0 0 20px; padding: 0; color: #333; font-size: 13px;" {
                        @for issue in &report.issues {
                            li style="margin-bottom: 4px;" { (issue.text()) }
                        }
                    }
                }
            }
            @if !report.recommendations.is_empty() {
                div .compliance-recommendations style="margin-top: 12px;" {
                    div style="font-weight: 600; color: #28a745; font-size: 14px;" { "Recommendations:" }
                    ul style="margin: 6px 0 0 20px; padding: 0; color: #333; font-size: 13px;" {
                        @for recommendation in &report.recommendations {
                            li style="margin-bottom: 4px;" { (recommendation) }
                        }
                    }
                }
            }
            @if report.fallback {
                div .compliance-fallback-note style="margin-top: 12px; font-size: 12px; color: #856404;" {
                    (FALLBACK_NOTE)
                }
            }
        }
    }
}

/// Replace any existing widget with one for `report`.
pub fn render_widget(document: &NodeRef, report: &ComplianceReport, show_warnings: bool) -> Anchor {
    let removed = dom::remove_all(document, &format!("#{}", WIDGET_ID));
    if removed > 0 {
        debug!("Removed {} existing widget(s)", removed);
    }

    let markup = widget_markup(report, show_warnings).into_string();
    let Some(widget) = detached_element(&markup, &format!("#{}", WIDGET_ID)) else {
        warn!("Widget markup did not produce an element");
        return Anchor::DocumentRoot;
    };

    let anchor = place(document, widget);
    debug!("Placed compliance widget at {:?}", anchor);
    anchor
}

fn place(document: &NodeRef, widget: NodeRef) -> Anchor {
    if let Some(price) = dom::select_first(document, "#corePrice_feature_div")
        .or_else(|| dom::select_first(document, "#price"))
    {
        price.as_node().prepend(widget);
        return Anchor::PriceBlock;
    }

    if let Some(parent) =
        dom::select_first(document, "#productTitle").and_then(|title| title.as_node().parent())
    {
        parent.append(widget);
        return Anchor::TitleParent;
    }

    if let Some(bullets) = dom::select_first(document, "#feature-bullets") {
        bullets.as_node().insert_before(widget);
        return Anchor::FeatureBullets;
    }

    match dom::select_first(document, "body") {
        Some(body) => {
            body.as_node().append(widget);
            Anchor::Body
        }
        None => {
            document.append(widget);
            Anchor::DocumentRoot
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Issue;

    fn report(score: f64) -> ComplianceReport {
        ComplianceReport {
            compliance_score: score,
            issues: vec![Issue::warning("price", "Price display format needs improvement")],
            recommendations: vec!["Ensure price is clearly visible".into()],
            fallback: false,
            product_title: None,
            product_price: None,
        }
    }

    fn widget_text(document: &NodeRef) -> String {
        let widget = dom::select_first(document, &format!("#{}", WIDGET_ID)).unwrap();
        dom::text(&widget)
    }

    #[test]
    fn test_render_twice_leaves_one_widget() {
        let doc = dom::parse(
            "<body><div id='ppd'><span id='productTitle'>Atta</span></div></body>",
        );
        render_widget(&doc, &report(40.0), true);
        render_widget(&doc, &report(90.0), true);

        assert_eq!(dom::select_all(&doc, &format!("#{}", WIDGET_ID)).len(), 1);
        assert!(widget_text(&doc).contains("Compliance Score: 90%"));
    }

    #[test]
    fn test_anchor_priority() {
        let cases = [
            (
                "<div id='corePrice_feature_div'><span>₹50</span></div><div><h1 id='productTitle'>A</h1></div>",
                Anchor::PriceBlock,
            ),
            ("<div id='price'>₹50</div>", Anchor::PriceBlock),
            ("<div id='t'><h1 id='productTitle'>A</h1></div>", Anchor::TitleParent),
            ("<div id='feature-bullets'><ul></ul></div>", Anchor::FeatureBullets),
            ("<p>nothing here</p>", Anchor::Body),
        ];

        for (html, expected) in cases {
            let doc = dom::parse(html);
            assert_eq!(render_widget(&doc, &report(90.0), true), expected, "{}", html);
        }
    }

    #[test]
    fn test_price_block_gets_widget_first() {
        let doc = dom::parse("<div id='corePrice_feature_div'><span id='p'>₹50</span></div>");
        render_widget(&doc, &report(90.0), true);

        let block = dom::select_first(&doc, "#corePrice_feature_div").unwrap();
        let first = block.as_node().first_child().unwrap();
        let first = first.as_element().unwrap();
        assert_eq!(
            first.attributes.borrow().get("id"),
            Some(WIDGET_ID)
        );
    }

    #[test]
    fn test_widget_before_feature_bullets() {
        let doc = dom::parse("<div id='c'><div id='feature-bullets'></div></div>");
        render_widget(&doc, &report(90.0), true);

        let bullets = dom::select_first(&doc, "#feature-bullets").unwrap();
        let previous = bullets.as_node().previous_sibling().unwrap();
        assert_eq!(
            previous.as_element().unwrap().attributes.borrow().get("id"),
            Some(WIDGET_ID)
        );
    }

    #[test]
    fn test_colours_follow_threshold() {
        let compliant = widget_markup(&report(80.5), true).into_string();
        assert!(compliant.contains("#28a745") && compliant.contains("✅"));

        let flagged = widget_markup(&report(80.0), true).into_string();
        assert!(flagged.contains("2px solid #dc3545") && flagged.contains("❌"));
    }

    #[test]
    fn test_sections() {
        let doc = dom::parse("<body></body>");
        render_widget(&doc, &report(42.86), true);
        let text = widget_text(&doc);
        assert!(text.contains("Compliance Score: 42.86%"));
        assert!(text.contains("Verified by E-Commerce Guard"));
        assert!(text.contains("Issues Found:"));
        assert!(text.contains("Price display format needs improvement"));
        assert!(text.contains("Recommendations:"));
        assert!(text.contains("Ensure price is clearly visible"));
        assert!(!text.contains(FALLBACK_NOTE));
    }

    #[test]
    fn test_warnings_hidden_and_fallback_note() {
        let mut fallback = report(85.0);
        fallback.fallback = true;

        let doc = dom::parse("<body></body>");
        render_widget(&doc, &fallback, false);
        let text = widget_text(&doc);
        assert!(!text.contains("Issues Found:"));
        assert!(text.contains(FALLBACK_NOTE));
    }

    #[test]
    fn test_issue_text_is_escaped() {
        let mut hostile = report(10.0);
        hostile.issues = vec![Issue::Text("<script>alert(1)</script>".into())];

        let doc = dom::parse("<body></body>");
        render_widget(&doc, &hostile, true);
        assert!(dom::select_all(&doc, "script").is_empty());
        assert!(widget_text(&doc).contains("<script>alert(1)</script>"));
    }
}
