//! Page-context → background-context messaging.
//!
//! A message is first offered to the primary transport (the background
//! service's channel) under a fixed timeout. If that times out or errors
//! the fallback transport (direct router dispatch) gets one attempt under
//! its own, shorter timeout. Both failing yields `None`, never an error.

pub mod transport;

pub use transport::{ChannelTransport, DirectTransport};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::app::Result;
use crate::domain::{ComplianceReport, ListingProduct, ListingVerdict, Platform, ScrapedProduct};

/// Name of the compliance-check handler on the background side
pub const COMPLIANCE_CHECKER: &str = "complianceChecker";

/// Headroom on top of a handler's own worst case (validation, storage)
const HANDLER_SLACK_MS: u64 = 500;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Timeout for the background channel in milliseconds
    pub primary_timeout_ms: u64,
    /// Timeout for direct dispatch in milliseconds
    pub fallback_timeout_ms: u64,
    /// Background service queue size
    pub queue_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            primary_timeout_ms: 3000,
            fallback_timeout_ms: 2000,
            queue_capacity: 100,
        }
    }
}

impl RelayConfig {
    pub fn primary_timeout(&self) -> Duration {
        Duration::from_millis(self.primary_timeout_ms)
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback_timeout_ms)
    }

    /// Raise both timeouts so a handler that may take up to `budget`
    /// still answers within them. Values already long enough are kept.
    pub fn covering(mut self, budget: Duration) -> Self {
        let needed = u64::try_from(budget.as_millis())
            .unwrap_or(u64::MAX)
            .saturating_add(HANDLER_SLACK_MS);

        if self.primary_timeout_ms < needed {
            warn!(
                "Raising primary relay timeout from {}ms to {}ms to fit the scoring client",
                self.primary_timeout_ms, needed
            );
            self.primary_timeout_ms = needed;
        }
        if self.fallback_timeout_ms < needed {
            warn!(
                "Raising fallback relay timeout from {}ms to {}ms to fit the scoring client",
                self.fallback_timeout_ms, needed
            );
            self.fallback_timeout_ms = needed;
        }
        self
    }
}

/// A named message with a JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub name: String,
    pub body: Value,
}

impl RelayMessage {
    pub fn new(name: impl Into<String>, body: Value) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    pub fn check_product(product: &ScrapedProduct) -> Result<Self> {
        let product = serde_json::to_value(product)?;
        Ok(Self::new(COMPLIANCE_CHECKER, json!({ "product": product })))
    }

    pub fn check_listing(products: &[ListingProduct], platform: Platform) -> Result<Self> {
        let products = serde_json::to_value(products)?;
        Ok(Self::new(
            COMPLIANCE_CHECKER,
            json!({ "products": products, "platform": platform.as_str() }),
        ))
    }
}

/// What the background side answers with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelayResponse {
    Error { error: String },
    Results { results: Vec<ListingVerdict> },
    Report(ComplianceReport),
}

impl RelayResponse {
    pub fn error(message: impl Into<String>) -> Self {
        RelayResponse::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RelayResponse::Error { .. })
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, message: &RelayMessage) -> Result<RelayResponse>;
}

pub struct Relay {
    primary: Arc<dyn Transport>,
    fallback: Option<Arc<dyn Transport>>,
    config: RelayConfig,
}

impl Relay {
    pub fn new(primary: Arc<dyn Transport>, config: RelayConfig) -> Self {
        Self {
            primary,
            fallback: None,
            config,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn Transport>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub async fn send(&self, message: &RelayMessage) -> Option<RelayResponse> {
        if let Some(response) = self
            .attempt(self.primary.as_ref(), message, self.config.primary_timeout())
            .await
        {
            return Some(response);
        }

        let fallback = self.fallback.as_ref()?;
        debug!("Retrying '{}' via {}", message.name, fallback.name());
        self.attempt(fallback.as_ref(), message, self.config.fallback_timeout())
            .await
    }

    async fn attempt(
        &self,
        transport: &dyn Transport,
        message: &RelayMessage,
        limit: Duration,
    ) -> Option<RelayResponse> {
        match timeout(limit, transport.send(message)).await {
            Ok(Ok(response)) => Some(response),
            Ok(Err(e)) => {
                warn!("{} failed for '{}': {}", transport.name(), message.name, e);
                None
            }
            Err(_) => {
                warn!(
                    "{} timed out after {}ms for '{}'",
                    transport.name(),
                    limit.as_millis(),
                    message.name
                );
                None
            }
        }
    }
}
