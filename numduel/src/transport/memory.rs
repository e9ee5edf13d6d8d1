//! In-process transport: each direction is a single-slot event queue.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Transport, TransportError};
use crate::bridge::protocol::Event;

pub struct MemoryTransport {
    tx: mpsc::Sender<Event>,
    rx: mpsc::Receiver<Event>,
}

/// Two connected endpoints. A sender waits while its slot is occupied.
pub fn memory_pair() -> (MemoryTransport, MemoryTransport) {
    let (a_tx, b_rx) = mpsc::channel(1);
    let (b_tx, a_rx) = mpsc::channel(1);
    (
        MemoryTransport { tx: a_tx, rx: a_rx },
        MemoryTransport { tx: b_tx, rx: b_rx },
    )
}

impl MemoryTransport {
    /// Take an already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, event: Event) -> Result<(), TransportError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Result<Event, TransportError> {
        self.rx.recv().await.ok_or(TransportError::Closed)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
