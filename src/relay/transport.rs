use std::sync::Arc;

use async_trait::async_trait;

use crate::app::Result;
use crate::background::{BackgroundHandle, MessageRouter};
use crate::relay::{RelayMessage, RelayResponse, Transport};

/// Sends through the background service's queue.
#[derive(Clone)]
pub struct ChannelTransport {
    handle: BackgroundHandle,
}

impl ChannelTransport {
    pub fn new(handle: BackgroundHandle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    fn name(&self) -> &'static str {
        "background channel"
    }

    async fn send(&self, message: &RelayMessage) -> Result<RelayResponse> {
        self.handle.request(message.clone()).await
    }
}

/// Dispatches straight into the router, bypassing the queue.
#[derive(Clone)]
pub struct DirectTransport {
    router: Arc<MessageRouter>,
}

impl DirectTransport {
    pub fn new(router: Arc<MessageRouter>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl Transport for DirectTransport {
    fn name(&self) -> &'static str {
        "direct dispatch"
    }

    async fn send(&self, message: &RelayMessage) -> Result<RelayResponse> {
        Ok(self.router.dispatch(message).await)
    }
}
