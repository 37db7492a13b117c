//! Realtime notifications.
//!
//! A transport delivers hub invocations as [`Notification`]s, in arrival
//! order and at least once. [`HubTransport`] speaks the JSON hub protocol
//! over a websocket; [`ChannelTransport`] feeds notifications in-process.

mod protocol;
mod transport;

pub use protocol::*;
pub use transport::HubTransport;

use crate::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};

/// One server-to-client invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Method name, e.g. `ReceivePatchMessage`
    pub target: String,
    /// Positional arguments
    pub arguments: Vec<serde_json::Value>,
}

impl Notification {
    pub fn new(target: impl Into<String>, arguments: Vec<serde_json::Value>) -> Self {
        Self {
            target: target.into(),
            arguments,
        }
    }
}

/// Source of realtime notifications.
#[async_trait]
pub trait EventTransport: Send + Sync + 'static {
    /// Connect and start delivering notifications.
    ///
    /// Resolves once the first connection is established. The receiver
    /// closes when the transport gives up for good.
    async fn start(&self) -> Result<mpsc::Receiver<Notification>, TransportError>;
}

/// In-process transport: whatever is sent on the paired sender is delivered.
#[derive(Debug)]
pub struct ChannelTransport {
    rx: Mutex<Option<mpsc::Receiver<Notification>>>,
}

impl ChannelTransport {
    /// Create a transport and the sender that feeds it.
    pub fn new(buffer: usize) -> (Self, mpsc::Sender<Notification>) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            Self {
                rx: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait]
impl EventTransport for ChannelTransport {
    async fn start(&self) -> Result<mpsc::Receiver<Notification>, TransportError> {
        self.rx
            .lock()
            .await
            .take()
            .ok_or(TransportError::AlreadyStarted)
    }
}
