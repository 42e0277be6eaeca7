//! Random Controller
//!
//! The default built-in strategy: plays a uniformly random card from hand, or
//! passes when the hand is empty.
//! Useful for:
//! - Exercising the orchestrator without any external service
//! - Baseline comparisons (any real agent should easily beat this)
//!
//! Choices come from a ChaCha RNG seeded per seat, so a fixed seed replays the
//! same decisions.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_core::{Controller, DecisionView, GameFault};


/// A controller that plays random cards.
#[derive(Debug, Clone)]
pub struct RandomController {
    name: String,
    rng: ChaCha8Rng,
    decisions: u64,
}

impl RandomController {
    pub fn new(name: impl Into<String>, seed: u64) -> Self {
        Self {
            name: name.into(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            decisions: 0,
        }
    }

    /// Decisions made since the last `new_game`
    pub fn decisions(&self) -> u64 {
        self.decisions
    }
}

impl Controller for RandomController {
    fn choose(&mut self, view: &DecisionView) -> Result<Option<usize>, GameFault> {
        self.decisions += 1;
        let indices: Vec<usize> = (0..view.hand.len()).collect();
        Ok(indices.choose(&mut self.rng).copied())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn new_game(&mut self) {
        self.decisions = 0;
    }
}
