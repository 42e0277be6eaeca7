//! Drives single matches and whole tournaments, and owns the policy for
//! games that throw.

use sim_core::{Participant, RuleSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::FaultPolicy;
use crate::error::{AttemptError, FatalFault, RunError, SetupError};
use crate::match_runner::{MatchConfig, ReplaySink};
use crate::results::TournamentResults;
use crate::scheduler::{MatchResult, MatchScheduler};
use crate::tournament::Tournament;

/// A match played under the retry policy
#[derive(Debug, Clone)]
pub struct PairingOutcome {
    pub result: MatchResult,
    /// Recoverable errors seen while playing
    pub faults: u32,
    /// Gave up after too many recoverable errors
    pub abandoned: bool,
}

pub struct Orchestrator {
    scheduler: MatchScheduler,
    faults: FaultPolicy,
    sink: Arc<dyn ReplaySink>,
}

impl Orchestrator {
    pub fn new(scheduler: MatchScheduler, faults: FaultPolicy, sink: Arc<dyn ReplaySink>) -> Self {
        Self {
            scheduler,
            faults,
            sink,
        }
    }

    /// Play one match outside a tournament.
    ///
    /// Recoverable game errors are fatal here unless the fault policy says
    /// otherwise, in which case they are retried like in a tournament.
    pub fn play_match(&self, config: &MatchConfig) -> Result<PairingOutcome, FatalFault> {
        let games = if config.games_per_match == 0 {
            let n = config.n_games;
            format!("{} game{}", n, if n == 1 { "" } else { "s" })
        } else {
            format!("best of {}", config.games_per_match)
        };
        self.sink.emit(&format!(
            "{} - {} of {}",
            config.players_label(),
            games,
            config.rules.format
        ));

        if !self.faults.escalate_outside_tournament {
            return self.play_with_retries(config);
        }

        match self.scheduler.run_match(config) {
            Ok(result) => Ok(PairingOutcome {
                result,
                faults: 0,
                abandoned: false,
            }),
            Err(AttemptError::Fatal(fault)) => Err(fault),
            Err(AttemptError::Recoverable { game, message }) => Err(FatalFault {
                game,
                players: config.players_label(),
                elapsed: Duration::ZERO,
                reason: format!("recoverable error outside a tournament: {}", message),
            }),
        }
    }

    /// Play a match, absorbing up to `max_recoverable_per_pairing` recoverable
    /// errors. One more abandons the match; the leader on decisive wins (if
    /// any) still takes it.
    pub fn play_with_retries(&self, config: &MatchConfig) -> Result<PairingOutcome, FatalFault> {
        let mut result = MatchResult::for_match(config);
        let mut faults = 0;
        let mut abandoned = false;

        while !MatchScheduler::is_match_over(config, &result) {
            match self.scheduler.play_next(config, &mut result) {
                Ok(()) => {}
                Err(AttemptError::Fatal(fault)) => return Err(fault),
                Err(err @ AttemptError::Recoverable { .. }) => {
                    faults += 1;
                    self.sink.emit(&err.to_string());
                    if faults > self.faults.max_recoverable_per_pairing {
                        warn!(faults, players = %config.players_label(), "abandoning match");
                        self.sink.emit("Exceeded number of exceptions thrown. Abandoning match...");
                        abandoned = true;
                        break;
                    }
                    self.sink.emit("Game threw exception. Abandoning game and continuing...");
                }
            }
        }

        if abandoned {
            result.winner = result.leader();
        }
        Ok(PairingOutcome {
            result,
            faults,
            abandoned,
        })
    }

    /// Run `tournament` to completion over `participants`.
    ///
    /// Only a fatal fault or an engine bookkeeping error stops the run early.
    pub fn run_tournament(
        &self,
        tournament: &mut Tournament,
        participants: &[Participant],
        rules: &RuleSet,
        results: &mut TournamentResults,
    ) -> Result<(), RunError> {
        self.sink.emit(&format!(
            "Starting a {} tournament with {} players over {} rounds",
            tournament.format(),
            participants.len(),
            tournament.total_rounds()
        ));

        let mut current_round = 0;
        while !tournament.is_complete() {
            if tournament.active_round() != current_round {
                if current_round != 0 {
                    self.sink.emit(&format!("End Round - {}", current_round));
                }
                current_round = tournament.active_round();
                self.sink.emit("");
                self.sink.emit(&format!("Round {} Pairings:", current_round));
                for pairing in tournament.active_pairings() {
                    self.sink.emit(&pairing.header());
                }
                self.sink.emit("");
            }

            let Some(mut pairing) = tournament.next_pairing()? else {
                warn!(round = current_round, "no pairing available before round end");
                break;
            };
            self.sink.emit(&format!("Round {} - {}", current_round, pairing.header()));

            if pairing.is_bye() {
                results.add_bye(&pairing);
            } else {
                let seats = pairing
                    .players()
                    .iter()
                    .map(|player| {
                        participants
                            .iter()
                            .find(|p| p.id == player.id)
                            .cloned()
                            .ok_or(SetupError::UnknownParticipant(player.id))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let config = MatchConfig::new(rules.clone(), rules.games_per_match, 1, seats);
                let outcome = self.play_with_retries(&config)?;

                if outcome.abandoned {
                    pairing.mark_abandoned();
                }
                if let Some(winner) = outcome.result.winner {
                    // First entrant with the winner's id, once
                    if let Some(player) = pairing.players().iter().find(|p| p.id == winner).cloned() {
                        pairing.set_winner(player.id)?;
                        self.sink.emit(&format!("Match Winner - {}!", player.name()));
                        self.sink.emit("");
                    }
                }
                results.add_pairing(&pairing, &outcome);
            }

            tournament.report_completion(pairing)?;
        }

        info!(
            rounds = tournament.active_round(),
            pairings = tournament.history().len(),
            "tournament finished"
        );
        results.finish(tournament)?;
        for line in results.generate_report().lines() {
            self.sink.emit(line);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod orchestrator_tests;
