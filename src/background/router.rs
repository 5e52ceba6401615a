use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::relay::{RelayMessage, RelayResponse};

#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Answer one message body. Problems are reported in-band.
    async fn handle(&self, body: &Value) -> RelayResponse;
}

/// Handlers keyed by message name.
#[derive(Default, Clone)]
pub struct MessageRouter {
    handlers: HashMap<String, Arc<dyn MessageHandler>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn MessageHandler>) {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            warn!("Replaced handler for '{}'", name);
        }
    }

    pub fn with_handler(mut self, name: impl Into<String>, handler: Arc<dyn MessageHandler>) -> Self {
        self.register(name, handler);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub async fn dispatch(&self, message: &RelayMessage) -> RelayResponse {
        match self.handlers.get(&message.name) {
            Some(handler) => {
                debug!("Dispatching '{}'", message.name);
                handler.handle(&message.body).await
            }
            None => {
                warn!("No handler registered for '{}'", message.name);
                RelayResponse::error(format!("Unknown message: {}", message.name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl MessageHandler for Echo {
        async fn handle(&self, body: &Value) -> RelayResponse {
            RelayResponse::error(body.to_string())
        }
    }

    #[tokio::test]
    async fn test_dispatch_by_name() {
        let router = MessageRouter::new().with_handler("echo", Arc::new(Echo));

        let response = router
            .dispatch(&RelayMessage::new("echo", json!({ "a": 1 })))
            .await;
        assert_eq!(response, RelayResponse::error(r#"{"a":1}"#));
        assert_eq!(router.names(), vec!["echo"]);
    }

    #[tokio::test]
    async fn test_unknown_name_is_an_error_response() {
        let router = MessageRouter::new();
        let response = router.dispatch(&RelayMessage::new("nope", json!({}))).await;
        assert_eq!(response, RelayResponse::error("Unknown message: nope"));
    }
}
