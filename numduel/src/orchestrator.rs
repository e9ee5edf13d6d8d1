//! Host side of a game: owns the peer process and the transport resources.
//!
//! Flow:
//! 1. Create the FIFO pair (fifo transport only)
//! 2. Spawn the peer subprocess
//! 3. Send Init, open our end of the transport, wait for Ready
//! 4. Play the configured rounds, or stop early on SIGINT/SIGTERM
//! 5. Collect the peer's report, reap it, remove the FIFOs

use std::process::Stdio;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::bridge::codec::ControlCodec;
use crate::bridge::protocol::{ControlRequest, ControlResponse, Event};
use crate::config::{GameConfig, TransportChoice};
use crate::error::{GameError, Result};
use crate::game::{GameSummary, host_game};
use crate::numbers::RandomNumbers;
use crate::transport::fifo::{FifoChannels, FifoSide, FifoTransport};
use crate::transport::{PeerTransportInfo, Transport, TransportError};

type ControlReader = FramedRead<ChildStdout, ControlCodec<ControlResponse>>;

/// Starts the peer process. Swappable so tests can launch something else.
pub trait PeerSpawner: Send + Sync {
    fn spawn(&self, transport: TransportChoice) -> std::io::Result<Child>;
}

/// Re-executes the current binary with the hidden `peer` subcommand.
pub struct SelfSpawner;

impl PeerSpawner for SelfSpawner {
    fn spawn(&self, transport: TransportChoice) -> std::io::Result<Child> {
        let exe = std::env::current_exe()?;
        Command::new(exe)
            .args(["peer", "--transport", transport.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
    }
}

/// What the host holds on to for the lifetime of the transport.
enum Resources {
    Signal,
    Fifo(FifoChannels),
}

fn prepare(config: &GameConfig) -> Result<(Resources, PeerTransportInfo)> {
    match config.transport {
        TransportChoice::Signal => Ok((
            Resources::Signal,
            PeerTransportInfo::Signal {
                host_pid: std::process::id() as i32,
            },
        )),
        TransportChoice::Fifo => {
            let channels = FifoChannels::create(&config.fifo_dir).map_err(TransportError::from)?;
            let info = channels.peer_info();
            Ok((Resources::Fifo(channels), info))
        }
    }
}

async fn open_host_end(resources: &Resources, peer_pid: i32) -> Result<Box<dyn Transport>> {
    match resources {
        #[cfg(target_os = "linux")]
        Resources::Signal => {
            let transport = crate::transport::signal::SignalTransport::open(peer_pid)
                .map_err(TransportError::from)?;
            Ok(Box::new(transport))
        }
        #[cfg(not(target_os = "linux"))]
        Resources::Signal => {
            let _ = peer_pid;
            Err(crate::config::ConfigError::UnsupportedTransport(TransportChoice::Signal).into())
        }
        Resources::Fifo(channels) => {
            let transport =
                FifoTransport::connect(channels.to_host(), channels.to_peer(), FifoSide::Host)
                    .await
                    .map_err(TransportError::from)?;
            Ok(Box::new(transport))
        }
    }
}

fn control_error(e: std::io::Error) -> GameError {
    GameError::Control(e.to_string())
}

async fn expect_ready(reader: &mut ControlReader) -> Result<()> {
    match reader.next().await {
        Some(Ok(ControlResponse::Ready)) => Ok(()),
        Some(Ok(ControlResponse::Failed { error })) => Err(GameError::Peer(error)),
        Some(Ok(other)) => Err(GameError::Control(format!(
            "expected ready, got {other:?}"
        ))),
        Some(Err(e)) => Err(control_error(e)),
        None => Err(GameError::Peer("exited before reporting ready".to_string())),
    }
}

/// Drain the peer's control stream and reap it. Returns its round count.
async fn finish_peer(child: &mut Child, reader: &mut ControlReader, grace: Duration) -> Result<u32> {
    let wait = async {
        let mut rounds_played = None;
        let mut failure = None;
        while let Some(frame) = reader.next().await {
            match frame.map_err(control_error)? {
                ControlResponse::Finished { rounds_played: n } => rounds_played = Some(n),
                ControlResponse::Failed { error } => failure = Some(error),
                ControlResponse::Ready => tracing::warn!("Peer sent a second ready"),
            }
        }
        let status = child
            .wait()
            .await
            .map_err(|e| GameError::Peer(format!("wait failed: {e}")))?;
        tracing::debug!(%status, "Peer exited");

        if let Some(error) = failure {
            return Err(GameError::Peer(error));
        }
        match rounds_played {
            Some(n) if status.success() => Ok(n),
            Some(_) => Err(GameError::Peer(format!("exited with {status}"))),
            None => Err(GameError::Peer(format!("exited with {status} without a report"))),
        }
    };

    let outcome = tokio::time::timeout(grace, wait).await;
    match outcome {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(?grace, "Peer did not exit in time, killing it");
            if let Err(e) = child.kill().await {
                tracing::error!(error = %e, "Failed to kill peer");
            }
            Err(GameError::Timeout("peer to exit"))
        }
    }
}

async fn abort_peer(child: &mut Child) {
    if let Err(e) = child.kill().await {
        tracing::warn!(error = %e, "Failed to kill peer");
    }
}

/// Resolves with the name of the first SIGINT or SIGTERM received.
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// A game cut short by a `Terminate` the host did not send (an external
/// SIGTERM in signal mode) is an interruption, not a result.
fn completed(summary: GameSummary) -> Result<GameSummary> {
    if summary.terminated_early {
        tracing::warn!(
            rounds = summary.rounds_played(),
            "Game terminated before the last round"
        );
        return Err(GameError::Interrupted("terminate request"));
    }
    Ok(summary)
}

pub async fn run_host(config: &GameConfig) -> Result<GameSummary> {
    run_host_with(config, &SelfSpawner).await
}

pub async fn run_host_with(config: &GameConfig, spawner: &dyn PeerSpawner) -> Result<GameSummary> {
    config.validate()?;

    let (resources, peer_info) = prepare(config)?;

    let mut child = spawner.spawn(config.transport).map_err(GameError::Spawn)?;
    let peer_pid = child
        .id()
        .ok_or_else(|| GameError::Peer("exited before it could be addressed".to_string()))?
        as i32;
    tracing::info!(peer_pid, transport = %config.transport, "Spawned peer");

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| GameError::Control("peer stdin not captured".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| GameError::Control("peer stdout not captured".to_string()))?;
    let mut ctrl_writer = FramedWrite::new(stdin, ControlCodec::<ControlRequest>::new());
    let mut ctrl_reader = FramedRead::new(stdout, ControlCodec::<ControlResponse>::new());

    let init = ControlRequest::Init {
        max_number: config.max_number,
        seed: config.peer_seed(),
        transport: peer_info,
    };
    if let Err(e) = ctrl_writer.send(init).await {
        abort_peer(&mut child).await;
        return Err(control_error(e));
    }

    let startup = async {
        let transport = open_host_end(&resources, peer_pid).await?;
        expect_ready(&mut ctrl_reader).await?;
        Ok::<_, GameError>(transport)
    };
    let started = tokio::time::timeout(config.startup_timeout, startup).await;
    let mut transport = match started {
        Ok(Ok(transport)) => transport,
        Ok(Err(e)) => {
            abort_peer(&mut child).await;
            return Err(e);
        }
        Err(_) => {
            abort_peer(&mut child).await;
            return Err(GameError::Timeout("peer to become ready"));
        }
    };
    tracing::info!("Peer ready");

    let mut numbers = RandomNumbers::from_seed(config.seed);
    let played = tokio::select! {
        result = host_game(config.max_number, config.rounds, &mut transport, &mut numbers) => result,
        signal = shutdown_signal() => Err(GameError::Interrupted(signal)),
    };

    if let Err(e) = &played {
        tracing::warn!(error = %e, "Game ended abnormally, terminating peer");
        if let Err(e) = transport.send(Event::Terminate).await {
            tracing::debug!(error = %e, "Terminate not delivered");
        }
    }

    let report = finish_peer(&mut child, &mut ctrl_reader, config.shutdown_timeout).await;
    drop(transport);
    drop(ctrl_writer);
    if let Resources::Fifo(mut channels) = resources
        && let Err(e) = channels.cleanup()
    {
        tracing::warn!(error = %e, "Failed to remove FIFO directory");
    }

    let summary = completed(played?)?;
    let peer_rounds = report?;
    if peer_rounds != summary.rounds_played() {
        tracing::warn!(
            host = summary.rounds_played(),
            peer = peer_rounds,
            "Host and peer disagree on rounds played"
        );
    }
    Ok(summary)
}
