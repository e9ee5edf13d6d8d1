use thiserror::Error;

use crate::config::ConfigError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The two sides disagree on which round is being played.
    #[error("round mismatch: expected round {expected}, host announced {announced}")]
    RoundMismatch { expected: u32, announced: u32 },

    #[error("failed to spawn peer: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("control channel: {0}")]
    Control(String),

    #[error("peer failed: {0}")]
    Peer(String),

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("interrupted by {0}")]
    Interrupted(&'static str),
}

pub type Result<T> = std::result::Result<T, GameError>;
