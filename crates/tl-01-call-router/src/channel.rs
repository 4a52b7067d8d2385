//! Message channel between the foreground and the background worker.
//!
//! Frames are plain JSON values. The in-memory implementation pairs two
//! bounded tokio mpsc queues into a duplex link.

use crate::domain::ChannelError;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};

/// Sending half of a channel endpoint.
#[async_trait]
pub trait FrameSender: Send + Sync {
    async fn send(&self, frame: Value) -> Result<(), ChannelError>;
}

/// Receiving half of a channel endpoint.
#[async_trait]
pub trait FrameReceiver: Send + Sync {
    /// Wait for the next frame. `Closed` once every peer sender is gone.
    async fn receive(&self) -> Result<Value, ChannelError>;
}

#[derive(Debug, Clone)]
pub struct MemorySender(mpsc::Sender<Value>);

#[derive(Debug)]
pub struct MemoryReceiver(Mutex<mpsc::Receiver<Value>>);

#[async_trait]
impl FrameSender for MemorySender {
    async fn send(&self, frame: Value) -> Result<(), ChannelError> {
        self.0.send(frame).await.map_err(|_| ChannelError::Closed)
    }
}

#[async_trait]
impl FrameReceiver for MemoryReceiver {
    async fn receive(&self) -> Result<Value, ChannelError> {
        let mut guard = self.0.lock().await;
        guard.recv().await.ok_or(ChannelError::Closed)
    }
}

/// One side of a duplex link.
#[derive(Debug)]
pub struct Endpoint {
    pub sender: MemorySender,
    pub receiver: MemoryReceiver,
}

/// Create a linked pair of endpoints: `(foreground, background)`.
pub fn duplex(capacity: usize) -> (Endpoint, Endpoint) {
    let (call_tx, call_rx) = mpsc::channel(capacity);
    let (response_tx, response_rx) = mpsc::channel(capacity);

    let foreground = Endpoint {
        sender: MemorySender(call_tx),
        receiver: MemoryReceiver(Mutex::new(response_rx)),
    };
    let background = Endpoint {
        sender: MemorySender(response_tx),
        receiver: MemoryReceiver(Mutex::new(call_rx)),
    };
    (foreground, background)
}
