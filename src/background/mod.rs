//! The privileged side of the relay: named message handlers run by an
//! actor task.

pub mod handlers;
pub mod router;
pub mod service;

pub use handlers::{ComplianceChecker, INVALID_PRODUCT_DATA};
pub use router::{MessageHandler, MessageRouter};
pub use service::{spawn_background_service, BackgroundHandle, BackgroundService};
