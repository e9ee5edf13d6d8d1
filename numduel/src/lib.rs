//! numduel: a two-process number guessing game.
//!
//! The host process spawns a copy of itself as the peer. They take turns as
//! thinker and guesser, exchanging events over queued signals or a FIFO pair.

pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod logging;
pub mod numbers;
#[cfg(unix)]
pub mod orchestrator;
pub mod round;
pub mod transport;
#[cfg(unix)]
pub mod worker;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, GameConfig, TransportChoice};
pub use error::{GameError, Result};
pub use game::{GameSummary, RoundRecord, host_game, join_game};
#[cfg(unix)]
pub use orchestrator::{PeerSpawner, SelfSpawner, run_host, run_host_with};
pub use round::Role;
#[cfg(unix)]
pub use worker::run_peer;
