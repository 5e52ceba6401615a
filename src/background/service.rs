use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::app::{GuardError, Result};
use crate::background::MessageRouter;
use crate::relay::{RelayMessage, RelayResponse};

/// Message type for the background service
#[derive(Debug)]
enum Command {
    /// Route a message and reply on the oneshot
    Dispatch {
        message: RelayMessage,
        reply: oneshot::Sender<RelayResponse>,
    },
    /// Stop the service
    Shutdown,
}

/// Handle to send messages to the background service
#[derive(Clone)]
pub struct BackgroundHandle {
    tx: mpsc::Sender<Command>,
}

impl BackgroundHandle {
    /// Send a message and wait for the handler's answer
    pub async fn request(&self, message: RelayMessage) -> Result<RelayResponse> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Dispatch { message, reply })
            .await
            .map_err(|_| GuardError::Relay("background service is not running".into()))?;

        rx.await
            .map_err(|_| GuardError::Relay("background service dropped the request".into()))
    }

    /// Shutdown the background service
    pub async fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown).await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Background service that answers relay messages
pub struct BackgroundService {
    router: Arc<MessageRouter>,
    rx: mpsc::Receiver<Command>,
}

impl BackgroundService {
    /// Create the service and return a handle to communicate with it
    pub fn new(router: Arc<MessageRouter>, capacity: usize) -> (Self, BackgroundHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = BackgroundHandle { tx };
        let service = Self { router, rx };
        (service, handle)
    }

    /// Run the service loop
    pub async fn run(mut self) {
        info!("Background service started ({})", self.router.names().join(", "));

        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Dispatch { message, reply } => {
                    // A slow handler must not hold up the queue
                    let router = self.router.clone();
                    tokio::spawn(async move {
                        let response = router.dispatch(&message).await;
                        if reply.send(response).is_err() {
                            debug!("Caller of '{}' went away before the reply", message.name);
                        }
                    });
                }
                Command::Shutdown => {
                    info!("Background service shutting down");
                    break;
                }
            }
        }
    }
}

/// Spawn the background service as a tokio task
pub fn spawn_background_service(router: Arc<MessageRouter>, capacity: usize) -> BackgroundHandle {
    let (service, handle) = BackgroundService::new(router, capacity);

    tokio::spawn(async move {
        service.run().await;
    });

    handle
}

impl std::fmt::Debug for BackgroundHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundHandle")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}
