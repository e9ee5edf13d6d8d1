//! Round protocol: one participant's side of a single round.
//!
//! Flow per role:
//! - **Thinker**: draw secret → wait for `Guess` → judge → reply `Verdict`,
//!   until a guess matches
//! - **Guesser**: draw candidate → send `Guess` → wait for `Verdict`, until
//!   one is correct
//!
//! `recv` is the only suspension point. `Terminate` ends either loop at once
//! with [`RoundEnd::Terminated`]; any other event that does not fit the
//! current wait is logged and dropped without touching round state.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::bridge::protocol::Event;
use crate::numbers::NumberSource;
use crate::round::{GuesserOutcome, Role, RoundEnd, RoundState, ThinkerOutcome};
use crate::transport::{Transport, TransportError};

/// Play the thinking side of one round.
pub async fn run_as_thinker<T, N>(
    max_number: u32,
    transport: &mut T,
    numbers: &mut N,
) -> Result<RoundEnd<ThinkerOutcome>, TransportError>
where
    T: Transport + ?Sized,
    N: NumberSource + ?Sized,
{
    let mut state = RoundState::new(numbers.draw(max_number));
    debug!(max_number, secret = state.secret(), "Secret drawn, waiting for guesses");

    loop {
        let value = match transport.recv().await? {
            Event::Guess { value } => value,
            Event::Terminate => {
                info!(attempts = state.attempts(), "Terminated while thinking");
                return Ok(RoundEnd::Terminated);
            }
            stray => {
                warn!(event = %stray, role = %Role::Thinker, "Ignoring out-of-sequence event");
                continue;
            }
        };

        let judgement = state.judge(value);
        debug!(
            guess = value,
            attempts = judgement.attempts,
            correct = judgement.correct,
            "Guess judged"
        );

        // Timed before the winning verdict goes out.
        let outcome = state.is_concluded().then(|| ThinkerOutcome {
            secret: state.secret(),
            attempts: state.attempts(),
            elapsed: state.elapsed(),
        });

        transport
            .send(Event::Verdict {
                correct: judgement.correct,
                attempts: judgement.attempts,
            })
            .await?;

        if let Some(outcome) = outcome {
            info!(
                secret = outcome.secret,
                attempts = outcome.attempts,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "Secret guessed"
            );
            return Ok(RoundEnd::Concluded(outcome));
        }
    }
}

/// Play the guessing side of one round.
///
/// Candidates are drawn independently each time; repeats are expected.
pub async fn run_as_guesser<T, N>(
    max_number: u32,
    transport: &mut T,
    numbers: &mut N,
) -> Result<RoundEnd<GuesserOutcome>, TransportError>
where
    T: Transport + ?Sized,
    N: NumberSource + ?Sized,
{
    let started_at = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let candidate = numbers.draw(max_number);
        debug!(attempt = attempts, guess = candidate, "Guessing");
        transport.send(Event::Guess { value: candidate }).await?;

        loop {
            match transport.recv().await? {
                Event::Verdict {
                    correct: true,
                    attempts: reported,
                } => {
                    let outcome = GuesserOutcome {
                        attempts: reported,
                        local_attempts: attempts,
                        last_guess: candidate,
                        elapsed: started_at.elapsed(),
                    };
                    if reported != attempts {
                        warn!(reported, local = attempts, "Thinker counted a different number of attempts");
                    }
                    info!(guess = candidate, attempts = reported, "Guessed the secret");
                    return Ok(RoundEnd::Concluded(outcome));
                }
                Event::Verdict { correct: false, .. } => {
                    debug!(guess = candidate, "Wrong, trying again");
                    break;
                }
                Event::Terminate => {
                    info!(attempts, "Terminated while guessing");
                    return Ok(RoundEnd::Terminated);
                }
                stray => {
                    warn!(event = %stray, role = %Role::Guesser, "Ignoring out-of-sequence event");
                }
            }
        }
    }
}
