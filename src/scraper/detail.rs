use std::collections::{BTreeMap, HashSet};

use kuchikiki::NodeRef;
use url::Url;

use crate::dom;
use crate::domain::ScrapedProduct;
use crate::scraper::resolve_url;
use crate::scraper::selectors::DetailSelectors;

/// Thumbnail size token and its full-size replacement
const THUMBNAIL_TOKEN: &str = "US40";
const FULL_SIZE_TOKEN: &str = "SL1500";

pub fn scrape_detail(document: &NodeRef, selectors: &DetailSelectors, page_url: &Url) -> ScrapedProduct {
    let title = dom::select_first(document, selectors.title)
        .map(|el| dom::text(&el))
        .unwrap_or_default();

    let price = dom::select_first(document, selectors.price)
        .map(|el| dom::text(&el))
        .unwrap_or_default();

    let description = dom::select_all(document, selectors.description_items)
        .iter()
        .map(dom::text)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    ScrapedProduct {
        product_url: page_url.to_string(),
        title,
        price,
        images: scrape_images(document, selectors, page_url),
        description,
        meta: scrape_meta(document, selectors),
    }
}

/// Main image first, then gallery thumbnails upgraded to full size.
fn scrape_images(document: &NodeRef, selectors: &DetailSelectors, page_url: &Url) -> Vec<String> {
    let mut images = Vec::new();

    if let Some(src) = dom::select_first(document, selectors.main_image).and_then(|el| dom::attr(&el, "src")) {
        images.push(resolve_url(page_url, &src));
    }

    for thumb in dom::select_all(document, selectors.thumbnails) {
        if let Some(src) = dom::attr(&thumb, "src").or_else(|| dom::attr(&thumb, "data-src")) {
            let upgraded = src.replace(THUMBNAIL_TOKEN, FULL_SIZE_TOKEN);
            images.push(resolve_url(page_url, &upgraded));
        }
    }

    let mut seen = HashSet::new();
    images.retain(|url| !url.is_empty() && seen.insert(url.clone()));
    images
}

fn scrape_meta(document: &NodeRef, selectors: &DetailSelectors) -> BTreeMap<String, String> {
    let mut meta = BTreeMap::new();

    for row in dom::select_all(document, selectors.meta_rows) {
        let (Some(key_el), Some(value_el)) = (
            dom::select_first(row.as_node(), selectors.meta_key),
            dom::select_first(row.as_node(), selectors.meta_value),
        ) else {
            continue;
        };

        let key = normalize_key(&dom::text(&key_el));
        if key.is_empty() {
            continue;
        }
        let value = dom::text(&value_el);

        if key.contains("brand") {
            meta.insert("brand".to_string(), value.clone());
        }
        if key.contains("manufacturer") {
            meta.insert("manufacturer".to_string(), value.clone());
        }
        meta.insert(key, value);
    }

    meta
}

/// Lowercase, drop colons and the bidi marks Amazon pads labels with
fn normalize_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ':' | '\u{200e}' | '\u{200f}'))
        .collect::<String>()
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Platform;
    use crate::scraper::selectors::PlatformSelectors;

    const PAGE: &str = r#"
        <html><body>
          <div id="titleSection"><span id="productTitle">
              Aashirvaad Atta with Multigrains, 5kg
          </span></div>
          <div id="corePrice_feature_div"><span class="a-price"><span class="a-offscreen">₹289.00</span></span></div>
          <div id="imgTagWrapperId"><img src="https://m.media-amazon.com/images/I/main._SL1500_.jpg"></div>
          <div id="altImages">
            <span class="a-button-thumbnail"><img src="https://m.media-amazon.com/images/I/main._SL1500_.jpg"></span>
            <span class="a-button-thumbnail"><img src="https://m.media-amazon.com/images/I/side._AC_US40_.jpg"></span>
            <span class="a-button-thumbnail"><img data-src="/images/I/back._US40_.jpg"></span>
          </div>
          <div id="feature-bullets"><ul>
            <li><span class="a-list-item"> High in protein </span></li>
            <li><span class="a-list-item">   </span></li>
            <li><span class="a-list-item">Made with 6 grains</span></li>
          </ul></div>
          <div id="detailBullets_feature_div"><ul>
            <li><span class="a-list-item"><span class="a-text-bold">Manufacturer &rlm; : &lrm;</span><span>ITC Limited</span></span></li>
            <li><span class="a-list-item"><span class="a-text-bold">Country of Origin :</span><span>India</span></span></li>
          </ul></div>
          <table id="productDetails_detailBullets_sections1">
            <tr><th> Brand Name </th><td>Aashirvaad</td></tr>
          </table>
        </body></html>
    "#;

    fn selectors() -> &'static DetailSelectors {
        PlatformSelectors::for_platform(Platform::Amazon).detail.as_ref().unwrap()
    }

    fn scrape(html: &str) -> ScrapedProduct {
        let url = Url::parse("https://www.amazon.in/dp/B0DW4JNC4T").unwrap();
        scrape_detail(&dom::parse(html), selectors(), &url)
    }

    #[test]
    fn test_scrapes_text_fields() {
        let product = scrape(PAGE);
        assert_eq!(product.product_url, "https://www.amazon.in/dp/B0DW4JNC4T");
        assert_eq!(product.title, "Aashirvaad Atta with Multigrains, 5kg");
        assert_eq!(product.price, "₹289.00");
        assert_eq!(product.description, "High in protein\nMade with 6 grains");
    }

    #[test]
    fn test_images_main_first_deduplicated_and_upgraded() {
        let product = scrape(PAGE);
        assert_eq!(
            product.images,
            vec![
                "https://m.media-amazon.com/images/I/main._SL1500_.jpg",
                "https://m.media-amazon.com/images/I/side._AC_SL1500_.jpg",
                "https://www.amazon.in/images/I/back._SL1500_.jpg",
            ]
        );
    }

    #[test]
    fn test_meta_rows_and_aliases() {
        let product = scrape(PAGE);
        assert_eq!(product.meta.get("manufacturer").map(String::as_str), Some("ITC Limited"));
        assert_eq!(product.meta.get("country of origin").map(String::as_str), Some("India"));
        assert_eq!(product.meta.get("brand name").map(String::as_str), Some("Aashirvaad"));
        assert_eq!(product.meta.get("brand").map(String::as_str), Some("Aashirvaad"));
    }

    #[test]
    fn test_missing_fields_are_empty_not_fatal() {
        let product = scrape(r#"<span id="productTitle">Only a title</span>"#);
        assert_eq!(product.title, "Only a title");
        assert_eq!(product.price, "");
        assert!(product.images.is_empty());
        assert_eq!(product.description, "");
        assert!(product.meta.is_empty());
    }
}
