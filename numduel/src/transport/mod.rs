//! Event delivery between the two participants.
//!
//! Bindings:
//! - **signal**: queued signals with an integer payload, read back through a
//!   signalfd (Linux only)
//! - **fifo**: a pair of named pipes carrying fixed-size records
//! - **memory**: in-process single-slot channels, for tests and embedding

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bridge::protocol::Event;

#[cfg(unix)]
pub mod fifo;
pub mod memory;
#[cfg(target_os = "linux")]
pub mod signal;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport i/o failed: {0}")]
    Io(#[from] io::Error),

    /// The peer hung up; nothing more will arrive.
    #[error("peer closed the channel")]
    Closed,

    #[error("failed to deliver {event} to pid {pid}: {source}")]
    SendFailed {
        event: &'static str,
        pid: i32,
        #[source]
        source: io::Error,
    },

    #[error("{event} cannot be carried by the {transport} transport")]
    Unencodable {
        event: &'static str,
        transport: &'static str,
    },
}

/// One endpoint of a connection to exactly one peer.
///
/// Implementations must deliver events in order and without loss. `recv` is
/// the only place a participant waits, and it must yield the thread while
/// waiting.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, event: Event) -> Result<(), TransportError>;

    /// Wait for the next event from the peer.
    async fn recv(&mut self) -> Result<Event, TransportError>;

    /// Binding name for logs.
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&mut self, event: Event) -> Result<(), TransportError> {
        (**self).send(event).await
    }

    async fn recv(&mut self) -> Result<Event, TransportError> {
        (**self).recv().await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// What the spawned peer needs to open its end of the game transport.
///
/// Paths are from the peer's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PeerTransportInfo {
    Signal { host_pid: i32 },
    Fifo { inbound: PathBuf, outbound: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_transport_info_roundtrips() {
        let info = PeerTransportInfo::Fifo {
            inbound: PathBuf::from("/tmp/numduel-5/to-peer.fifo"),
            outbound: PathBuf::from("/tmp/numduel-5/to-host.fifo"),
        };
        let json = serde_json::to_string(&info).unwrap();
        let parsed: PeerTransportInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn send_failure_names_event_and_pid() {
        let err = TransportError::SendFailed {
            event: "guess",
            pid: 31,
            source: io::Error::from_raw_os_error(3),
        };
        let text = err.to_string();
        assert!(text.starts_with("failed to deliver guess to pid 31"), "{text}");
    }
}
