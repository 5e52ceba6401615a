use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::app::Result;
use crate::compliance::{ApiConfig, ComplianceService};
use crate::domain::{ComplianceReport, ScrapedProduct};

/// Body posted to the scoring endpoint
#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    product: &'a ScrapedProduct,
}

/// One round-trip to the scoring service.
#[async_trait]
pub trait ScoringApi: Send + Sync {
    async fn score(&self, product: &ScrapedProduct) -> Result<Value>;
}

pub struct HttpScoringApi {
    client: Client,
    endpoint: String,
}

impl HttpScoringApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("ecomguard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl ScoringApi for HttpScoringApi {
    async fn score(&self, product: &ScrapedProduct) -> Result<Value> {
        let body = serde_json::to_vec(&ScoreRequest { product })?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
            .send()
            .await?;

        // Non-2xx goes down the same retry path as transport errors
        let response = response.error_for_status()?;
        let bytes = response.bytes().await?;

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl<T: ScoringApi + ?Sized> ScoringApi for Arc<T> {
    async fn score(&self, product: &ScrapedProduct) -> Result<Value> {
        (**self).score(product).await
    }
}

/// Scoring-service client with bounded retries and a mock fallback.
pub struct RemoteComplianceClient<A: ScoringApi = HttpScoringApi> {
    api: A,
    config: ApiConfig,
}

impl RemoteComplianceClient<HttpScoringApi> {
    pub fn from_config(config: ApiConfig) -> Result<Self> {
        let api = HttpScoringApi::new(&config)?;
        Ok(Self::with_api(api, config))
    }
}

impl<A: ScoringApi> RemoteComplianceClient<A> {
    pub fn with_api(api: A, config: ApiConfig) -> Self {
        Self { api, config }
    }

    /// Single attempt: call the service and normalize its answer
    pub async fn request(&self, product: &ScrapedProduct) -> Result<ComplianceReport> {
        let value = self.api.score(product).await?;
        ComplianceReport::from_response(&value)
    }
}

#[async_trait]
impl<A: ScoringApi> ComplianceService for RemoteComplianceClient<A> {
    async fn check(&self, product: &ScrapedProduct) -> ComplianceReport {
        let attempts = self.config.total_attempts();

        for attempt in 1..=attempts {
            let delay = self.config.backoff_before(attempt);
            if !delay.is_zero() {
                debug!("Waiting {:?} before scoring attempt {}", delay, attempt);
                tokio::time::sleep(delay).await;
            }

            match self.request(product).await {
                Ok(report) => {
                    info!(
                        "Scored {} at {}% (attempt {})",
                        product.display_title(),
                        report.display_score(),
                        attempt
                    );
                    return report;
                }
                Err(e) => {
                    warn!("Scoring attempt {}/{} failed: {}", attempt, attempts, e);
                }
            }
        }

        warn!(
            "Scoring service unavailable after {} attempts, using mock report",
            attempts
        );
        self.config.mock.for_product(product)
    }
}
