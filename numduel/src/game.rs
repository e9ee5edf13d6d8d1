//! Game loop: a sequence of rounds with alternating roles.
//!
//! The host owns round numbering and role parity. Before each round it sends
//! `Begin { round, role }` (the role the *peer* plays) and waits for the
//! matching `Ready`; no round event is sent before both sides agree. After the
//! last round the host sends `Terminate`. The peer keeps no round counter of
//! its own beyond checking that announcements arrive in sequence.

use std::fmt::Write as _;
use std::time::Duration;

use tracing::{Instrument, debug, info, info_span, warn};

use crate::bridge::protocol::Event;
use crate::engine::{run_as_guesser, run_as_thinker};
use crate::error::{GameError, Result};
use crate::numbers::NumberSource;
use crate::round::{Role, RoundEnd};
use crate::transport::Transport;

/// One concluded round as seen by one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundRecord {
    pub round: u32,
    pub role: Role,
    /// Thinker-counted attempts.
    pub attempts: u32,
    pub elapsed: Duration,
    /// Known only when this side was thinking.
    pub secret: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameSummary {
    pub rounds: Vec<RoundRecord>,
    /// A `Terminate` cut a round short.
    pub terminated_early: bool,
}

impl GameSummary {
    pub fn rounds_played(&self) -> u32 {
        self.rounds.len() as u32
    }

    pub fn total_attempts(&self) -> u32 {
        self.rounds.iter().map(|r| r.attempts).sum()
    }

    /// Plain-text table for the console.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{:>5}  {:<8}  {:>6}  {:>8}  {:>10}", "round", "role", "secret", "attempts", "time");
        for r in &self.rounds {
            let secret = r.secret.map_or_else(|| "-".to_string(), |s| s.to_string());
            let _ = writeln!(
                out,
                "{:>5}  {:<8}  {:>6}  {:>8}  {:>9.3}s",
                r.round,
                r.role.to_string(),
                secret,
                r.attempts,
                r.elapsed.as_secs_f64()
            );
        }
        let _ = writeln!(
            out,
            "{} rounds, {} attempts in total{}",
            self.rounds_played(),
            self.total_attempts(),
            if self.terminated_early { " (terminated early)" } else { "" }
        );
        out
    }
}

/// Play one round in `role` and turn the engine result into a record.
async fn play_round<T, N>(
    round: u32,
    role: Role,
    max_number: u32,
    transport: &mut T,
    numbers: &mut N,
) -> Result<Option<RoundRecord>>
where
    T: Transport + ?Sized,
    N: NumberSource + ?Sized,
{
    let record = match role {
        Role::Thinker => match run_as_thinker(max_number, transport, numbers).await? {
            RoundEnd::Concluded(o) => Some(RoundRecord {
                round,
                role,
                attempts: o.attempts,
                elapsed: o.elapsed,
                secret: Some(o.secret),
            }),
            RoundEnd::Terminated => None,
        },
        Role::Guesser => match run_as_guesser(max_number, transport, numbers).await? {
            RoundEnd::Concluded(o) => Some(RoundRecord {
                round,
                role,
                attempts: o.attempts,
                elapsed: o.elapsed,
                secret: None,
            }),
            RoundEnd::Terminated => None,
        },
    };
    Ok(record)
}

/// Wait for the peer to accept round `round`. `false` if it terminated instead.
async fn await_ready<T: Transport + ?Sized>(transport: &mut T, round: u32) -> Result<bool> {
    loop {
        match transport.recv().await? {
            Event::Ready { round: r } if r == round => return Ok(true),
            Event::Terminate => return Ok(false),
            stray => warn!(event = %stray, round, "Ignoring event while waiting for ready"),
        }
    }
}

/// Pass a `Terminate` this side did not originate on to the peer, so it stops
/// waiting too. The peer may already be gone.
async fn forward_terminate<T: Transport + ?Sized>(transport: &mut T) {
    if let Err(e) = transport.send(Event::Terminate).await {
        debug!(error = %e, "Terminate not forwarded to peer");
    }
}

/// Run the initiating side for `rounds` rounds, then terminate the peer.
///
/// A `Terminate` received mid-game ends it early: it is forwarded to the peer
/// and the partial summary is returned with `terminated_early` set.
pub async fn host_game<T, N>(
    max_number: u32,
    rounds: u32,
    transport: &mut T,
    numbers: &mut N,
) -> Result<GameSummary>
where
    T: Transport + ?Sized,
    N: NumberSource + ?Sized,
{
    let mut summary = GameSummary::default();
    info!(max_number, rounds, transport = transport.name(), "Hosting game");

    for round in 1..=rounds {
        let role = Role::host_role(round);
        transport
            .send(Event::Begin {
                round,
                role: role.opposite(),
            })
            .await?;
        if !await_ready(transport, round).await? {
            warn!(round, "Terminated before the round started");
            forward_terminate(transport).await;
            summary.terminated_early = true;
            return Ok(summary);
        }

        let span = info_span!("round", round, %role);
        match play_round(round, role, max_number, transport, numbers)
            .instrument(span)
            .await?
        {
            Some(record) => summary.rounds.push(record),
            None => {
                warn!(round, "Terminated mid-round");
                forward_terminate(transport).await;
                summary.terminated_early = true;
                return Ok(summary);
            }
        }
    }

    transport.send(Event::Terminate).await?;
    info!(
        rounds = summary.rounds_played(),
        attempts = summary.total_attempts(),
        "Game over"
    );
    Ok(summary)
}

/// Follow the host's round announcements until it sends `Terminate`.
pub async fn join_game<T, N>(max_number: u32, transport: &mut T, numbers: &mut N) -> Result<GameSummary>
where
    T: Transport + ?Sized,
    N: NumberSource + ?Sized,
{
    let mut summary = GameSummary::default();
    let mut last_round = 0u32;
    info!(max_number, transport = transport.name(), "Joined game");

    loop {
        match transport.recv().await? {
            Event::Begin { round, role } => {
                let expected = last_round + 1;
                if round != expected {
                    return Err(GameError::RoundMismatch {
                        expected,
                        announced: round,
                    });
                }
                transport.send(Event::Ready { round }).await?;

                let span = info_span!("round", round, %role);
                match play_round(round, role, max_number, transport, numbers)
                    .instrument(span)
                    .await?
                {
                    Some(record) => summary.rounds.push(record),
                    None => {
                        summary.terminated_early = true;
                        break;
                    }
                }
                last_round = round;
            }
            Event::Terminate => break,
            stray => warn!(event = %stray, "Ignoring event between rounds"),
        }
    }

    info!(rounds = summary.rounds_played(), "Left game");
    Ok(summary)
}
