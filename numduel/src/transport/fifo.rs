//! Named-pipe transport: one FIFO per direction, fixed-size records.
//!
//! Directory layout: `{base}/numduel-{host pid}/{to-peer,to-host}.fifo`.
//! The host creates the directory before spawning the peer and removes it
//! once the game is over ([`FifoChannels`] does both).

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use tokio::net::unix::pipe;
use tokio::sync::oneshot;
use tokio_util::codec::{FramedRead, FramedWrite};

use super::{PeerTransportInfo, Transport, TransportError};
use crate::bridge::protocol::Event;
use crate::bridge::record::RecordCodec;

const TO_PEER: &str = "to-peer.fifo";
const TO_HOST: &str = "to-host.fifo";

/// The pair of FIFOs on disk, owned by the side that created them.
pub struct FifoChannels {
    dir: PathBuf,
}

impl FifoChannels {
    pub fn create(base: &Path) -> io::Result<Self> {
        let dir = base.join(format!("numduel-{}", std::process::id()));
        std::fs::create_dir_all(&dir)?;

        tracing::debug!(dir = %dir.display(), "Creating FIFO pair");

        // Constructed first so a failed mkfifo still removes the directory.
        let channels = Self { dir };
        for path in [channels.to_peer(), channels.to_host()] {
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
            mkfifo(&path, Mode::S_IRUSR | Mode::S_IWUSR).map_err(io::Error::from)?;
            tracing::trace!(path = %path.display(), "Created FIFO");
        }

        Ok(channels)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn to_peer(&self) -> PathBuf {
        self.dir.join(TO_PEER)
    }

    pub fn to_host(&self) -> PathBuf {
        self.dir.join(TO_HOST)
    }

    pub fn peer_info(&self) -> PeerTransportInfo {
        PeerTransportInfo::Fifo {
            inbound: self.to_peer(),
            outbound: self.to_host(),
        }
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.dir.exists() {
            tracing::debug!(dir = %self.dir.display(), "Removing FIFO pair");
            std::fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

impl Drop for FifoChannels {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            tracing::warn!(error = %e, "Failed to remove FIFO directory");
        }
    }
}

/// Which end of the pair is opening. Decides the open order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoSide {
    Host,
    Peer,
}

pub struct FifoTransport {
    reader: FramedRead<pipe::Receiver, RecordCodec>,
    writer: FramedWrite<pipe::Sender, RecordCodec>,
}

impl FifoTransport {
    /// Open both directions.
    ///
    /// Opening a FIFO blocks until the other end is opened too. The host opens
    /// its outbound FIFO first and the peer its inbound one first, so the two
    /// processes rendezvous on the same FIFO at each step. Once both opens
    /// return, each FIFO has a reader and a writer, and end-of-file means the
    /// peer really is gone.
    pub async fn connect(inbound: PathBuf, outbound: PathBuf, side: FifoSide) -> io::Result<Self> {
        tracing::debug!(
            inbound = %inbound.display(),
            outbound = %outbound.display(),
            ?side,
            "Opening FIFO transport"
        );

        // A detached thread rather than the blocking pool: if the peer never
        // shows up the open never returns, and runtime shutdown must not wait
        // for it.
        let (tx, rx) = oneshot::channel();
        std::thread::Builder::new()
            .name("numduel-fifo-open".to_string())
            .spawn(move || {
                let _ = tx.send(open_ends(&inbound, &outbound, side));
            })?;
        let (read_file, write_file) = rx
            .await
            .map_err(|_| io::Error::other("FIFO opener thread exited without a result"))??;

        let receiver = pipe::Receiver::from_file(read_file)?;
        let sender = pipe::Sender::from_file(write_file)?;

        tracing::debug!(?side, "FIFO transport open");
        Ok(Self {
            reader: FramedRead::new(receiver, RecordCodec),
            writer: FramedWrite::new(sender, RecordCodec),
        })
    }
}

fn open_ends(inbound: &Path, outbound: &Path, side: FifoSide) -> io::Result<(File, File)> {
    let open_read = || OpenOptions::new().read(true).open(inbound);
    let open_write = || OpenOptions::new().write(true).open(outbound);

    match side {
        FifoSide::Host => {
            let write = open_write()?;
            let read = open_read()?;
            Ok((read, write))
        }
        FifoSide::Peer => {
            let read = open_read()?;
            let write = open_write()?;
            Ok((read, write))
        }
    }
}

#[async_trait]
impl Transport for FifoTransport {
    async fn send(&mut self, event: Event) -> Result<(), TransportError> {
        self.writer.send(event).await.map_err(|e| {
            if e.kind() == io::ErrorKind::BrokenPipe {
                TransportError::Closed
            } else {
                TransportError::Io(e)
            }
        })
    }

    async fn recv(&mut self) -> Result<Event, TransportError> {
        match self.reader.next().await {
            Some(Ok(event)) => Ok(event),
            Some(Err(e)) => Err(TransportError::Io(e)),
            None => Err(TransportError::Closed),
        }
    }

    fn name(&self) -> &'static str {
        "fifo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::Role;

    async fn connected(channels: &FifoChannels) -> (FifoTransport, FifoTransport) {
        let host = FifoTransport::connect(channels.to_host(), channels.to_peer(), FifoSide::Host);
        let peer = FifoTransport::connect(channels.to_peer(), channels.to_host(), FifoSide::Peer);
        let (host, peer) = tokio::join!(host, peer);
        (host.unwrap(), peer.unwrap())
    }

    #[tokio::test]
    async fn create_makes_two_fifos_and_drop_removes_them() {
        use std::os::unix::fs::FileTypeExt;

        let base = tempfile::tempdir().unwrap();
        let channels = FifoChannels::create(base.path()).unwrap();
        let dir = channels.dir().to_path_buf();

        for path in [channels.to_peer(), channels.to_host()] {
            let meta = std::fs::metadata(&path).unwrap();
            assert!(meta.file_type().is_fifo(), "{} is not a fifo", path.display());
        }

        drop(channels);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn peer_info_points_peer_at_the_right_ends() {
        let base = tempfile::tempdir().unwrap();
        let channels = FifoChannels::create(base.path()).unwrap();
        match channels.peer_info() {
            PeerTransportInfo::Fifo { inbound, outbound } => {
                assert!(inbound.ends_with(TO_PEER));
                assert!(outbound.ends_with(TO_HOST));
            }
            other => panic!("unexpected info: {other:?}"),
        }
    }

    #[tokio::test]
    async fn events_flow_both_ways() {
        let base = tempfile::tempdir().unwrap();
        let channels = FifoChannels::create(base.path()).unwrap();
        let (mut host, mut peer) = connected(&channels).await;

        host.send(Event::Begin {
            round: 1,
            role: Role::Guesser,
        })
        .await
        .unwrap();
        assert_eq!(
            peer.recv().await.unwrap(),
            Event::Begin {
                round: 1,
                role: Role::Guesser
            }
        );

        peer.send(Event::Ready { round: 1 }).await.unwrap();
        peer.send(Event::Guess { value: 42 }).await.unwrap();
        assert_eq!(host.recv().await.unwrap(), Event::Ready { round: 1 });
        assert_eq!(host.recv().await.unwrap(), Event::Guess { value: 42 });

        host.send(Event::Verdict {
            correct: true,
            attempts: 1,
        })
        .await
        .unwrap();
        assert_eq!(
            peer.recv().await.unwrap(),
            Event::Verdict {
                correct: true,
                attempts: 1
            }
        );
    }

    #[tokio::test]
    async fn hangup_reads_as_closed() {
        let base = tempfile::tempdir().unwrap();
        let channels = FifoChannels::create(base.path()).unwrap();
        let (mut host, peer) = connected(&channels).await;

        drop(peer);
        assert!(matches!(host.recv().await, Err(TransportError::Closed)));
    }
}
