//! Sources of secrets and guesses.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Draws numbers uniformly from `[1, max]`.
pub trait NumberSource: Send {
    fn draw(&mut self, max: u32) -> u32;
}

/// Pseudo-random source. No fairness guarantees beyond what `rand` gives.
pub struct RandomNumbers {
    rng: StdRng,
}

impl RandomNumbers {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence, for `--seed` and tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }
}

impl NumberSource for RandomNumbers {
    fn draw(&mut self, max: u32) -> u32 {
        self.rng.gen_range(1..=max.max(1))
    }
}

/// Replays a fixed list, then repeats the last value.
///
/// Values are clamped into `[1, max]` so a script can never produce an
/// out-of-range draw.
#[derive(Debug, Clone)]
pub struct ScriptedNumbers {
    queue: VecDeque<u32>,
    last: u32,
}

impl ScriptedNumbers {
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        Self {
            queue: values.into_iter().collect(),
            last: 1,
        }
    }
}

impl NumberSource for ScriptedNumbers {
    fn draw(&mut self, max: u32) -> u32 {
        if let Some(next) = self.queue.pop_front() {
            self.last = next;
        }
        self.last.clamp(1, max.max(1))
    }
}
