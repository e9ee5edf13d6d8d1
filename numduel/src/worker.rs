//! Peer side of a game: runs in the child process the host spawned.
//!
//! The control channel is stdin/stdout. The host sends exactly one `Init`;
//! the peer opens its end of the game transport, answers `Ready`, follows the
//! host's rounds, and reports `Finished` (or `Failed`) before exiting.
//! Nothing else may be written to stdout in this process.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, stdin, stdout};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::bridge::codec::ControlCodec;
use crate::bridge::protocol::{ControlRequest, ControlResponse};
use crate::error::{GameError, Result};
use crate::game::{GameSummary, join_game};
use crate::numbers::RandomNumbers;
use crate::transport::fifo::{FifoSide, FifoTransport};
use crate::transport::{PeerTransportInfo, Transport, TransportError};

async fn open_peer_end(info: PeerTransportInfo) -> Result<Box<dyn Transport>> {
    match info {
        #[cfg(target_os = "linux")]
        PeerTransportInfo::Signal { host_pid } => {
            let transport = crate::transport::signal::SignalTransport::open(host_pid)
                .map_err(TransportError::from)?;
            Ok(Box::new(transport))
        }
        #[cfg(not(target_os = "linux"))]
        PeerTransportInfo::Signal { .. } => Err(crate::config::ConfigError::UnsupportedTransport(
            crate::config::TransportChoice::Signal,
        )
        .into()),
        PeerTransportInfo::Fifo { inbound, outbound } => {
            let transport = FifoTransport::connect(inbound, outbound, FifoSide::Peer)
                .await
                .map_err(TransportError::from)?;
            Ok(Box::new(transport))
        }
    }
}

async fn serve<R, W>(
    reader: &mut FramedRead<R, ControlCodec<ControlRequest>>,
    writer: &mut FramedWrite<W, ControlCodec<ControlResponse>>,
) -> Result<GameSummary>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let init = reader
        .next()
        .await
        .ok_or_else(|| GameError::Control("host closed the channel before init".to_string()))?
        .map_err(|e| GameError::Control(e.to_string()))?;
    let ControlRequest::Init {
        max_number,
        seed,
        transport: info,
    } = init;
    tracing::debug!(max_number, ?seed, ?info, "Received init");

    let mut transport = open_peer_end(info).await?;
    writer
        .send(ControlResponse::Ready)
        .await
        .map_err(|e| GameError::Control(e.to_string()))?;
    tracing::info!(transport = transport.name(), "Peer ready");

    let mut numbers = RandomNumbers::from_seed(seed);
    join_game(max_number, &mut transport, &mut numbers).await
}

/// Serve one game over the given control streams and report the result.
pub async fn run_peer_on<R, W>(input: R, output: W) -> Result<GameSummary>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut ctrl_reader = FramedRead::new(input, ControlCodec::<ControlRequest>::new());
    let mut ctrl_writer = FramedWrite::new(output, ControlCodec::<ControlResponse>::new());

    let result = serve(&mut ctrl_reader, &mut ctrl_writer).await;

    let report = match &result {
        Ok(summary) => ControlResponse::Finished {
            rounds_played: summary.rounds_played(),
        },
        Err(e) => {
            tracing::error!(error = %e, "Peer failed");
            ControlResponse::Failed {
                error: e.to_string(),
            }
        }
    };
    if let Err(e) = ctrl_writer.send(report).await {
        tracing::warn!(error = %e, "Failed to report to host");
    }

    result
}

pub async fn run_peer() -> Result<GameSummary> {
    run_peer_on(stdin(), stdout()).await
}
