use std::time::Duration;

use ecomguard::app::AppContext;
use ecomguard::config::Config;
use ecomguard::content::{Page, ScanOutcome};
use ecomguard::dom;
use ecomguard::domain::ExtensionSettings;
use ecomguard::relay::{RelayMessage, RelayResponse, COMPLIANCE_CHECKER};
use ecomguard::store::Store;
use serde_json::json;
use url::Url;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const DETAIL: &str = r#"<html><body>
    <div id="centerCol">
        <span id="productTitle">Aashirvaad Atta 5kg</span>
    </div>
    <div id="corePrice_feature_div"><span class="a-offscreen">₹245</span></div>
    <div id="feature-bullets"><ul>
        <li><span class="a-list-item">Whole wheat</span></li>
    </ul></div>
</body></html>"#;

fn offline_config() -> Config {
    let mut config = Config::default();
    config.api.enabled = false;
    config
}

#[tokio::test]
async fn test_detail_scan_with_scoring_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "complianceScore": 72,
            "issues": ["Missing country of origin"],
            "recommendations": ["Add country of origin information"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.api.endpoint = format!("{}/check-product", server.uri());
    let ctx = AppContext::in_memory(config).unwrap();

    let page = Page::new(Url::parse("https://www.amazon.in/dp/B0ATTA").unwrap(), DETAIL);
    let scan = ctx
        .content_script()
        .run(page, None, &ExtensionSettings::default())
        .await;

    let ScanOutcome::Detail { report, .. } = &scan.outcome else {
        panic!("expected a detail scan, got {:?}", scan.outcome);
    };
    assert_eq!(report.compliance_score, 72.0);
    assert!(!report.is_compliant());

    let document = dom::parse(&scan.html);
    let widget = dom::select_first(&document, "#compliance-widget-container").unwrap();
    let text = dom::text(&widget);
    assert!(text.contains("Compliance Score: 72%"));
    assert!(text.contains("Missing country of origin"));
    assert!(dom::attr(&widget, "style").unwrap().contains("#dc3545"));

    let stats = ctx.store.get_stats().unwrap();
    assert_eq!((stats.total_scanned, stats.flagged_products), (1, 1));
    assert_eq!(ctx.store.scan_count().unwrap(), 1);
}

#[tokio::test]
async fn test_unreachable_scoring_service_renders_mock_with_default_timeouts() {
    // Default retry and backoff settings; nothing listens on port 1
    let mut config = Config::default();
    config.api.endpoint = "http://127.0.0.1:1/check-product".to_string();
    let ctx = AppContext::in_memory(config).unwrap();
    assert!(ctx.config.relay.primary_timeout() > ctx.config.api.worst_case());

    let page = Page::new(Url::parse("https://www.amazon.in/dp/B0ATTA").unwrap(), DETAIL);
    let scan = ctx
        .content_script()
        .run(page, None, &ExtensionSettings::default())
        .await;

    let ScanOutcome::Detail { report, .. } = &scan.outcome else {
        panic!("expected the mock report, got {:?}", scan.outcome);
    };
    assert!(report.fallback);
    assert_eq!(report.compliance_score, 85.0);
    assert_eq!(report.product_title.as_deref(), Some("Aashirvaad Atta 5kg"));

    let document = dom::parse(&scan.html);
    let widget = dom::select_first(&document, "#compliance-widget-container").unwrap();
    assert!(dom::text(&widget).contains("Compliance Score: 85%"));

    let stats = ctx.store.get_stats().unwrap();
    assert_eq!((stats.total_scanned, stats.safe_products), (1, 1));
    assert_eq!(ctx.store.scan_count().unwrap(), 1);
}

#[tokio::test]
async fn test_relay_answers_malformed_and_unknown_messages() {
    let ctx = AppContext::in_memory(offline_config()).unwrap();

    let response = ctx
        .relay
        .send(&RelayMessage::new(COMPLIANCE_CHECKER, json!({ "foo": 1 })))
        .await;
    assert_eq!(
        response,
        Some(RelayResponse::error("Invalid product data received."))
    );

    let response = ctx.relay.send(&RelayMessage::new("unknown", json!({}))).await;
    assert!(response.is_some_and(|r| r.is_error()));
}

#[tokio::test]
async fn test_relay_falls_back_after_background_shutdown() {
    let ctx = AppContext::in_memory(offline_config()).unwrap();
    ctx.shutdown().await;

    // Wait for the service loop to exit
    for _ in 0..100 {
        if ctx.background.is_closed() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let body = json!({ "products": [{ "id": "a", "title": "", "price": "$10", "image": "http://x/y.jpg", "link": "http://a" }] });
    let response = ctx
        .relay
        .send(&RelayMessage::new(COMPLIANCE_CHECKER, body))
        .await;

    let Some(RelayResponse::Results { results }) = response else {
        panic!("expected results from direct dispatch");
    };
    assert_eq!(results[0].link, "http://a");
    assert!(!results[0].is_compliant);
    assert_eq!(results[0].reasons, vec!["Missing product title."]);
}

#[tokio::test]
async fn test_retention_limit_from_config() {
    let mut config = offline_config();
    config.store.max_scan_records = 2;
    let ctx = AppContext::in_memory(config).unwrap();
    let script = ctx.content_script();

    for i in 0..4 {
        let url = Url::parse(&format!("https://www.amazon.in/dp/B{}", i)).unwrap();
        script
            .run(Page::new(url, DETAIL), None, &ExtensionSettings::default())
            .await;
        // Distinct epoch-ms keys
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    assert_eq!(ctx.store.scan_count().unwrap(), 2);
    assert_eq!(ctx.store.get_stats().unwrap().total_scanned, 4);
}

#[tokio::test]
async fn test_hidden_warnings_setting() {
    let ctx = AppContext::in_memory(offline_config()).unwrap();
    let settings = ExtensionSettings {
        show_warnings: false,
        ..ExtensionSettings::default()
    };

    // No image on the page: one issue that must stay hidden
    let page = Page::new(Url::parse("https://www.amazon.in/dp/B0").unwrap(), DETAIL);
    let scan = ctx.content_script().run(page, None, &settings).await;

    let document = dom::parse(&scan.html);
    let widget = dom::select_first(&document, "#compliance-widget-container").unwrap();
    assert!(!dom::text(&widget).contains("Issues Found:"));
    assert!(dom::text(&widget).contains("66.67%"));
}
