//! Game configuration.
//!
//! Everything here is validated before any process or FIFO is created.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ROUNDS: u32 = 10;

/// Largest bound every transport can carry as a signal payload.
pub const MAX_BOUND: u32 = i32::MAX as u32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required argument: <MAX_NUMBER>")]
    MissingBound,

    #[error("max number must be greater than 1 (got {0})")]
    BoundTooSmall(u32),

    #[error("max number must be at most 2147483647 (got {0})")]
    BoundTooLarge(u32),

    #[error("at least one round must be played")]
    NoRounds,

    #[error("the {0} transport is not available on this platform")]
    UnsupportedTransport(TransportChoice),
}

/// Which binding carries game events between the two processes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum TransportChoice {
    /// Queued real-time and user signals (Linux).
    #[cfg_attr(target_os = "linux", default)]
    Signal,
    /// A pair of named pipes.
    #[cfg_attr(not(target_os = "linux"), default)]
    Fifo,
}

impl TransportChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Signal => "signal",
            Self::Fifo => "fifo",
        }
    }

    pub fn is_supported(self) -> bool {
        match self {
            Self::Signal => cfg!(target_os = "linux"),
            Self::Fifo => cfg!(unix),
        }
    }
}

impl std::fmt::Display for TransportChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub max_number: u32,
    pub rounds: u32,
    pub transport: TransportChoice,
    /// Parent directory for the FIFO pair.
    pub fifo_dir: PathBuf,
    /// Seeds the host's generator; the peer gets `seed + 1`.
    pub seed: Option<u64>,
    /// How long the peer may take to open its end and report ready.
    pub startup_timeout: Duration,
    /// How long the peer may take to exit after `Terminate`.
    pub shutdown_timeout: Duration,
}

impl GameConfig {
    pub fn new(max_number: u32) -> Result<Self, ConfigError> {
        let config = Self {
            max_number,
            rounds: DEFAULT_ROUNDS,
            transport: TransportChoice::default(),
            fifo_dir: std::env::temp_dir(),
            seed: None,
            startup_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(5),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_transport(mut self, transport: TransportChoice) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_fifo_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fifo_dir = dir.into();
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_number <= 1 {
            return Err(ConfigError::BoundTooSmall(self.max_number));
        }
        if self.max_number > MAX_BOUND {
            return Err(ConfigError::BoundTooLarge(self.max_number));
        }
        if self.rounds == 0 {
            return Err(ConfigError::NoRounds);
        }
        if !self.transport.is_supported() {
            return Err(ConfigError::UnsupportedTransport(self.transport));
        }
        Ok(())
    }

    pub fn peer_seed(&self) -> Option<u64> {
        self.seed.map(|s| s.wrapping_add(1))
    }
}
