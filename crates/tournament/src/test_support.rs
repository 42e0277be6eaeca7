//! Scripted games for exercising the orchestrator without a rules engine.

use random_controller::RandomController;
use sim_core::{
    share_controller, CancelToken, Card, Deck, Game, GameFactory, GameFault, GameOutcome,
    LogEntry, LogKind, LogVerbosity, Participant, ParticipantId, RuleSet, Seat, SharedController,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::match_runner::{MatchRunner, MemorySink, RunnerConfig};

/// What a scripted game does when started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    Win(Seat),
    Draw,
    /// Runs until cancelled
    Hang,
    /// Ignores cancellation for the given time
    Stubborn(Duration),
    /// Like `Stubborn`, while holding the first seat's controller
    HoldController(Duration),
    Recoverable,
    Fatal,
    Panic,
    /// Returns without reaching a terminal state
    Unfinished,
    /// The factory refuses to create the game
    CreateFails,
}

pub struct ScriptedFactory {
    scripts: Mutex<VecDeque<Script>>,
    fallback: Script,
    created: AtomicU32,
}

impl ScriptedFactory {
    /// Games follow `scripts` in order, then repeat `fallback`.
    pub fn new(scripts: Vec<Script>, fallback: Script) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            fallback,
            created: AtomicU32::new(0),
        }
    }

    pub fn repeat(script: Script) -> Self {
        Self::new(Vec::new(), script)
    }

    /// Number of `create` calls so far
    pub fn created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }
}

impl GameFactory for ScriptedFactory {
    fn create(
        &self,
        _rules: &RuleSet,
        participants: &[Participant],
        game_index: u32,
    ) -> Result<Box<dyn Game>, GameFault> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        if script == Script::CreateFails {
            return Err(GameFault::Recoverable("no game for you".into()));
        }
        Ok(Box::new(ScriptedGame {
            script,
            game_index,
            controller: participants.first().map(|p| p.controller.clone()),
            outcome: None,
        }))
    }
}

pub struct ScriptedGame {
    script: Script,
    game_index: u32,
    controller: Option<SharedController>,
    outcome: Option<GameOutcome>,
}

impl Game for ScriptedGame {
    fn start(&mut self, cancel: &CancelToken) -> Result<(), GameFault> {
        match self.script.clone() {
            Script::Win(seat) => self.outcome = Some(GameOutcome::Winner(seat)),
            Script::Draw => self.outcome = Some(GameOutcome::Draw),
            Script::Hang => {
                while !cancel.is_cancelled() {
                    thread::sleep(Duration::from_millis(2));
                }
            }
            Script::Stubborn(time) => thread::sleep(time),
            Script::HoldController(time) => {
                if let Some(controller) = &self.controller {
                    let _held = controller.lock().unwrap();
                    thread::sleep(time);
                }
            }
            Script::Recoverable => return Err(GameFault::Recoverable("card script failed".into())),
            Script::Fatal => return Err(GameFault::Fatal("engine state corrupted".into())),
            Script::Panic => panic!("rules engine blew up"),
            Script::Unfinished | Script::CreateFails => {}
        }
        Ok(())
    }

    fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    fn force_draw(&mut self) {
        if self.outcome.is_none() {
            self.outcome = Some(GameOutcome::Draw);
        }
    }

    fn log(&self, verbosity: LogVerbosity) -> Vec<LogEntry> {
        let entries = vec![
            LogEntry::new(LogKind::Turn, format!("game {} turn 1", self.game_index + 1)),
            LogEntry::new(LogKind::MatchResult, format!("{:?}", self.outcome)),
        ];
        match verbosity {
            LogVerbosity::Full => entries,
            LogVerbosity::ResultsOnly => entries
                .into_iter()
                .filter(|e| e.kind == LogKind::MatchResult)
                .collect(),
        }
    }
}

/// `n` participants named `P1..Pn` with random controllers
pub fn participants(n: u32) -> Vec<Participant> {
    (0..n)
        .map(|i| {
            let name = format!("P{}", i + 1);
            Participant {
                id: ParticipantId(i),
                name: name.clone(),
                deck: Arc::new(Deck::new(format!("Deck{}", i + 1), vec![Card::new("Shock"); 10])),
                controller: share_controller(Box::new(RandomController::new(name, i as u64))),
            }
        })
        .collect()
}

pub fn fast_config() -> RunnerConfig {
    RunnerConfig {
        timeout: Duration::from_millis(200),
        cancel_grace: Duration::from_millis(200),
        stack_size: 2 * 1024 * 1024,
        ..RunnerConfig::default()
    }
}

pub fn runner(factory: Arc<ScriptedFactory>) -> (MatchRunner, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    (MatchRunner::new(factory, fast_config(), sink.clone()), sink)
}
