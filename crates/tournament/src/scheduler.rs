//! Replays games until a match is decided.

use serde::{Deserialize, Serialize};
use sim_core::ParticipantId;
use tracing::debug;

use crate::error::AttemptError;
use crate::match_runner::{GameAttempt, MatchConfig, MatchRunner, TerminalState};

/// Counted games of one match, in play order.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    pub participants: Vec<ParticipantId>,
    pub games: Vec<GameAttempt>,
    pub winner: Option<ParticipantId>,
}

impl MatchResult {
    pub fn new(participants: Vec<ParticipantId>) -> Self {
        Self {
            participants,
            games: Vec::new(),
            winner: None,
        }
    }

    pub fn for_match(config: &MatchConfig) -> Self {
        Self::new(config.participants.iter().map(|p| p.id).collect())
    }

    pub fn wins_for(&self, id: ParticipantId) -> u32 {
        self.games.iter().filter(|g| g.winner == Some(id)).count() as u32
    }

    pub fn draws(&self) -> u32 {
        self.games.iter().filter(|g| g.is_draw()).count() as u32
    }

    /// Participant with strictly the most decisive wins, if any
    pub fn leader(&self) -> Option<ParticipantId> {
        let mut best: Option<(ParticipantId, u32)> = None;
        let mut tied = false;
        for &id in &self.participants {
            let wins = self.wins_for(id);
            match best {
                Some((_, top)) if wins < top => {}
                Some((_, top)) if wins == top => tied = true,
                _ => {
                    best = Some((id, wins));
                    tied = false;
                }
            }
        }
        match best {
            Some((id, wins)) if wins > 0 && !tied => Some(id),
            _ => None,
        }
    }

    /// Short per-game summaries for reports
    pub fn summaries(&self) -> Vec<GameSummary> {
        self.games.iter().map(GameSummary::from).collect()
    }
}

/// Serializable view of a game attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub game: u32,
    pub elapsed_ms: u64,
    /// `winner`, `draw` or `timed_out`
    pub outcome: String,
    pub winner: Option<ParticipantId>,
}

impl From<&GameAttempt> for GameSummary {
    fn from(attempt: &GameAttempt) -> Self {
        let outcome = match attempt.state {
            TerminalState::Decided(_) => "winner",
            TerminalState::Draw => "draw",
            TerminalState::TimedOut => "timed_out",
            TerminalState::Crashed => "crashed",
        };
        Self {
            game: attempt.index + 1,
            elapsed_ms: attempt.elapsed.as_millis() as u64,
            outcome: outcome.to_string(),
            winner: attempt.winner,
        }
    }
}

/// Drives a [`MatchRunner`] through a whole match.
pub struct MatchScheduler {
    runner: MatchRunner,
}

impl MatchScheduler {
    pub fn new(runner: MatchRunner) -> Self {
        Self { runner }
    }

    /// Has the stopping rule triggered?
    pub fn is_match_over(config: &MatchConfig, result: &MatchResult) -> bool {
        let played = result.games.len() as u32;
        if config.games_per_match == 0 {
            return played >= config.n_games;
        }
        played >= config.games_per_match
            || result
                .participants
                .iter()
                .any(|&id| result.wins_for(id) >= config.games_to_win())
    }

    /// Play one more game and append it.
    ///
    /// A failed attempt is not appended, so a retry reuses the same game index.
    pub fn play_next(&self, config: &MatchConfig, result: &mut MatchResult) -> Result<(), AttemptError> {
        let index = result.games.len() as u32;
        let attempt = self.runner.run_one(config, index)?;
        result.games.push(attempt);
        if Self::is_match_over(config, result) {
            result.winner = result.leader();
            debug!(games = result.games.len(), winner = ?result.winner, "match over");
        }
        Ok(())
    }

    /// Play until the match is decided. The first attempt error ends the match.
    pub fn run_match(&self, config: &MatchConfig) -> Result<MatchResult, AttemptError> {
        let mut result = MatchResult::for_match(config);
        while !Self::is_match_over(config, &result) {
            self.play_next(config, &mut result)?;
        }
        Ok(result)
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod scheduler_tests;
