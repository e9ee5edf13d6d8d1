//! Test helpers.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;

use crate::bridge::protocol::Event;
use crate::transport::{Transport, TransportError};

/// Wraps a transport and keeps a log of everything that crossed it.
pub struct RecordingTransport<T> {
    inner: T,
    sent: Vec<Event>,
    received: Vec<Event>,
}

impl<T> RecordingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            sent: Vec::new(),
            received: Vec::new(),
        }
    }

    pub fn sent(&self) -> &[Event] {
        &self.sent
    }

    pub fn received(&self) -> &[Event] {
        &self.received
    }
}

#[async_trait]
impl<T: Transport> Transport for RecordingTransport<T> {
    async fn send(&mut self, event: Event) -> Result<(), TransportError> {
        self.inner.send(event).await?;
        self.sent.push(event);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Event, TransportError> {
        let event = self.inner.recv().await?;
        self.received.push(event);
        Ok(event)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Hands out a fixed list of incoming events, all already pending, and keeps
/// what was sent. Runs dry as [`TransportError::Closed`].
pub struct QueuedTransport {
    incoming: VecDeque<Event>,
    sent: Vec<Event>,
    send_delay: Duration,
}

impl QueuedTransport {
    pub fn new(incoming: impl IntoIterator<Item = Event>) -> Self {
        Self {
            incoming: incoming.into_iter().collect(),
            sent: Vec::new(),
            send_delay: Duration::ZERO,
        }
    }

    /// Make every send take this long.
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    pub fn sent(&self) -> &[Event] {
        &self.sent
    }

    pub fn pending(&self) -> usize {
        self.incoming.len()
    }
}

#[async_trait]
impl Transport for QueuedTransport {
    async fn send(&mut self, event: Event) -> Result<(), TransportError> {
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        self.sent.push(event);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Event, TransportError> {
        self.incoming.pop_front().ok_or(TransportError::Closed)
    }

    fn name(&self) -> &'static str {
        "queued"
    }
}
