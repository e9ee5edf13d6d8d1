//! Per-round state owned by the thinking side, and the outcomes a round
//! reports back to the game loop.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Which half of a round a process is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Draws the secret and judges guesses.
    Thinker,
    /// Proposes candidates until one is judged correct.
    Guesser,
}

impl Role {
    pub fn opposite(self) -> Self {
        match self {
            Self::Thinker => Self::Guesser,
            Self::Guesser => Self::Thinker,
        }
    }

    /// Role of the hosting process in a 1-based round. The host thinks first.
    pub fn host_role(round: u32) -> Self {
        if round % 2 == 1 {
            Self::Thinker
        } else {
            Self::Guesser
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thinker => f.write_str("thinker"),
            Self::Guesser => f.write_str("guesser"),
        }
    }
}

/// Result of judging one guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Judgement {
    pub correct: bool,
    pub attempts: u32,
}

/// Authoritative data for one round. Lives only in the thinker's process.
#[derive(Debug)]
pub struct RoundState {
    secret: u32,
    attempts: u32,
    started_at: Instant,
    concluded: bool,
}

impl RoundState {
    pub fn new(secret: u32) -> Self {
        Self {
            secret,
            attempts: 0,
            started_at: Instant::now(),
            concluded: false,
        }
    }

    pub fn secret(&self) -> u32 {
        self.secret
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_concluded(&self) -> bool {
        self.concluded
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Count one guess and compare it against the secret.
    ///
    /// A concluded round judges nothing further: the attempt count is frozen
    /// and every later guess is reported as the winning verdict again.
    pub fn judge(&mut self, guess: u32) -> Judgement {
        if self.concluded {
            return Judgement {
                correct: true,
                attempts: self.attempts,
            };
        }

        self.attempts += 1;
        self.concluded = guess == self.secret;
        Judgement {
            correct: self.concluded,
            attempts: self.attempts,
        }
    }
}

/// How a round ended from one participant's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEnd<T> {
    Concluded(T),
    /// A `Terminate` arrived before the round finished. No result exists.
    Terminated,
}

impl<T> RoundEnd<T> {
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    pub fn concluded(self) -> Option<T> {
        match self {
            Self::Concluded(outcome) => Some(outcome),
            Self::Terminated => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThinkerOutcome {
    pub secret: u32,
    pub attempts: u32,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuesserOutcome {
    /// Attempt count reported by the thinker; authoritative for reporting.
    pub attempts: u32,
    /// Guesses this side actually sent.
    pub local_attempts: u32,
    pub last_guess: u32,
    pub elapsed: Duration,
}
