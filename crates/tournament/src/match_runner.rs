//! Match runner for playing a single game under a wall-clock ceiling
//!
//! Every attempt gets a fresh game from the factory and plays it on its own
//! worker thread. The supervising thread waits for at most the configured
//! timeout; a game that overruns is cancelled and scored as a draw, a game
//! that panics or reports a fatal fault turns into a [`FatalFault`].

use sim_core::{
    CancelToken, Game, GameFactory, GameFault, GameOutcome, LogVerbosity, Participant,
    ParticipantId, RuleSet, Seat,
};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::GameSettings;
use crate::error::{AttemptError, FatalFault};

const SLOW_GAME_LINE: &str = "Stopping slow match as draw";

// =============================================================================
// Replay output
// =============================================================================

/// Destination of replay lines and result lines.
pub trait ReplaySink: Send + Sync {
    fn emit(&self, line: &str);
}

/// Writes replay output to stdout
#[derive(Debug, Default)]
pub struct StdoutSink;

impl ReplaySink for StdoutSink {
    fn emit(&self, line: &str) {
        println!("{}", line);
    }
}

/// Keeps replay output in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ReplaySink for MemorySink {
    fn emit(&self, line: &str) {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line.to_string()),
            Err(poisoned) => poisoned.into_inner().push(line.to_string()),
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the game envelope
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Hard ceiling for one game
    pub timeout: Duration,
    /// Time a cancelled game gets to stop before it is detached
    pub cancel_grace: Duration,
    /// Stack size of the worker thread
    pub stack_size: usize,
    pub verbosity: LogVerbosity,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::from_settings(&GameSettings::default(), false)
    }
}

impl RunnerConfig {
    pub fn from_settings(settings: &GameSettings, quiet: bool) -> Self {
        Self {
            timeout: settings.timeout(),
            cancel_grace: settings.cancel_grace(),
            stack_size: settings.stack_size_mb.saturating_mul(1024 * 1024),
            verbosity: if quiet {
                LogVerbosity::ResultsOnly
            } else {
                LogVerbosity::Full
            },
        }
    }
}

/// A match as the scheduler sees it. Read-only.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub rules: RuleSet,
    /// 0 plays exactly `n_games` games, otherwise best-of-N
    pub games_per_match: u32,
    pub n_games: u32,
    pub participants: Vec<Participant>,
}

impl MatchConfig {
    pub fn new(rules: RuleSet, games_per_match: u32, n_games: u32, participants: Vec<Participant>) -> Self {
        Self {
            rules,
            games_per_match,
            n_games,
            participants,
        }
    }

    /// Decisive wins that take a best-of-N match
    pub fn games_to_win(&self) -> u32 {
        self.games_per_match / 2 + 1
    }

    /// `Ai(1)-Burn vs Ai(2)-Elves`
    pub fn players_label(&self) -> String {
        self.participants
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(" vs ")
    }
}

// =============================================================================
// Attempts
// =============================================================================

/// How a game attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    Decided(Seat),
    Draw,
    /// Hit the ceiling; scored as a draw
    TimedOut,
    /// Never counted; the run stops
    Crashed,
}

/// One played game
#[derive(Debug, Clone)]
pub struct GameAttempt {
    /// 0-based game index within the match
    pub index: u32,
    pub elapsed: Duration,
    pub state: TerminalState,
    pub winner: Option<ParticipantId>,
    /// Replay and result lines, in emission order
    pub log: Vec<String>,
}

impl GameAttempt {
    pub fn is_decisive(&self) -> bool {
        matches!(self.state, TerminalState::Decided(_))
    }

    pub fn is_draw(&self) -> bool {
        matches!(self.state, TerminalState::Draw | TerminalState::TimedOut)
    }
}

type Played = (Box<dyn Game>, thread::Result<Result<(), GameFault>>);

/// What the supervisor got back from the worker
enum Report {
    Finished(Played),
    /// Cancelled after the ceiling; the game may still have reported
    TimedOut(Option<Played>),
    /// Worker went away without reporting
    Lost,
}

/// Runs single games
pub struct MatchRunner {
    factory: Arc<dyn GameFactory>,
    config: RunnerConfig,
    sink: Arc<dyn ReplaySink>,
}

impl MatchRunner {
    pub fn new(factory: Arc<dyn GameFactory>, config: RunnerConfig, sink: Arc<dyn ReplaySink>) -> Self {
        Self {
            factory,
            config,
            sink,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Play game `index` of `config`.
    ///
    /// Timeouts come back as `TerminalState::TimedOut`, never as an error.
    pub fn run_one(&self, config: &MatchConfig, index: u32) -> Result<GameAttempt, AttemptError> {
        let number = index + 1;
        let game = self
            .factory
            .create(&config.rules, &config.participants, index)
            .map_err(|fault| self.fault_error(config, number, Duration::ZERO, fault))?;

        debug!(game = number, players = %config.players_label(), "starting game");
        let started = Instant::now();
        let report = self.play_isolated(config, game, number)?;
        let elapsed = started.elapsed();

        match report {
            Report::Finished((game, Ok(Ok(())))) => self.finish(config, index, elapsed, Some(game), false),
            Report::Finished((mut game, Ok(Err(GameFault::Recoverable(message))))) => {
                finalize(game.as_mut());
                warn!(game = number, error = %message, "game threw a recoverable error");
                Err(AttemptError::Recoverable {
                    game: number,
                    message,
                })
            }
            Report::Finished((_, Ok(Err(GameFault::Fatal(reason))))) => {
                Err(self.crash(config, number, elapsed, reason).into())
            }
            Report::Finished((_, Err(payload))) => Err(self
                .crash(config, number, elapsed, format!("panicked: {}", panic_message(payload.as_ref())))
                .into()),
            Report::TimedOut(played) => {
                // A panicking game is not touched again
                let game = match played {
                    Some((game, Ok(_))) => Some(game),
                    _ => None,
                };
                self.finish(config, index, elapsed, game, true)
            }
            Report::Lost => Err(self
                .crash(config, number, elapsed, "worker exited without reporting".to_string())
                .into()),
        }
    }

    fn play_isolated(
        &self,
        config: &MatchConfig,
        game: Box<dyn Game>,
        number: u32,
    ) -> Result<Report, FatalFault> {
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let (tx, rx) = mpsc::channel::<Played>();

        let handle = thread::Builder::new()
            .name(format!("game-{}", number))
            .stack_size(self.config.stack_size)
            .spawn(move || {
                let mut game = game;
                let result = panic::catch_unwind(AssertUnwindSafe(|| game.start(&worker_cancel)));
                // The supervisor may have given up on us already
                let _ = tx.send((game, result));
            })
            .map_err(|e| {
                self.crash(config, number, Duration::ZERO, format!("could not spawn game thread: {}", e))
            })?;

        let report = match rx.recv_timeout(self.config.timeout) {
            Ok(played) => Report::Finished(played),
            Err(RecvTimeoutError::Timeout) => {
                cancel.cancel();
                warn!(game = number, timeout = ?self.config.timeout, "game exceeded the time limit, cancelling");
                match rx.recv_timeout(self.config.cancel_grace) {
                    Ok(played) => Report::TimedOut(Some(played)),
                    Err(_) => {
                        warn!(game = number, "game ignored cancellation, detaching its thread");
                        return Ok(Report::TimedOut(None));
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => Report::Lost,
        };

        // The worker has sent (or died); joining cannot block for long
        let _ = handle.join();
        Ok(report)
    }

    fn finish(
        &self,
        config: &MatchConfig,
        index: u32,
        elapsed: Duration,
        game: Option<Box<dyn Game>>,
        timed_out: bool,
    ) -> Result<GameAttempt, AttemptError> {
        let number = index + 1;
        let mut lines = Vec::new();
        let mut state = TerminalState::Draw;
        if timed_out {
            lines.push(SLOW_GAME_LINE.to_string());
            state = TerminalState::TimedOut;
        }

        if let Some(mut game) = game {
            finalize(game.as_mut());
            if !timed_out {
                state = match game.outcome() {
                    Some(GameOutcome::Winner(seat)) if seat < config.participants.len() => {
                        TerminalState::Decided(seat)
                    }
                    Some(GameOutcome::Winner(seat)) => {
                        return Err(self
                            .crash(config, number, elapsed, format!("winner seat {} out of range", seat))
                            .into());
                    }
                    Some(GameOutcome::Draw) | None => TerminalState::Draw,
                };
            }
            lines.extend(game.log(self.config.verbosity).iter().map(|entry| entry.to_string()));
        }

        let winner = match state {
            TerminalState::Decided(seat) => Some(&config.participants[seat]),
            _ => None,
        };
        let ms = elapsed.as_millis();
        lines.push(match winner {
            Some(p) => format!("Game Result: Game {} ended in {} ms. {} has won!", number, ms, p.name),
            None => format!("Game Result: Game {} ended in a Draw! Took {} ms.", number, ms),
        });

        Ok(self.record(index, elapsed, state, winner.map(|p| p.id), lines))
    }

    fn record(
        &self,
        index: u32,
        elapsed: Duration,
        state: TerminalState,
        winner: Option<ParticipantId>,
        log: Vec<String>,
    ) -> GameAttempt {
        for line in &log {
            self.sink.emit(line);
        }
        info!(game = index + 1, ?state, elapsed_ms = elapsed.as_millis() as u64, "game finished");
        GameAttempt {
            index,
            elapsed,
            state,
            winner,
            log,
        }
    }

    fn fault_error(&self, config: &MatchConfig, number: u32, elapsed: Duration, fault: GameFault) -> AttemptError {
        match fault {
            GameFault::Recoverable(message) => {
                warn!(game = number, error = %message, "could not create game");
                AttemptError::Recoverable {
                    game: number,
                    message,
                }
            }
            GameFault::Fatal(reason) => self.crash(config, number, elapsed, reason).into(),
        }
    }

    fn crash(&self, config: &MatchConfig, number: u32, elapsed: Duration, reason: String) -> FatalFault {
        let fault = FatalFault {
            game: number,
            players: config.players_label(),
            elapsed,
            reason,
        };
        error!(
            game = fault.game,
            players = %fault.players,
            elapsed_ms = elapsed.as_millis() as u64,
            state = ?TerminalState::Crashed,
            reason = %fault.reason,
            "game crashed"
        );
        fault
    }
}

/// Force a game that is not over into a draw. Idempotent.
fn finalize(game: &mut dyn Game) {
    if !game.is_over() {
        game.force_draw();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
#[path = "match_runner_tests.rs"]
mod match_runner_tests;
