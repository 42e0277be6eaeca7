use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Seat index within a single game (0-based, in registration order).
pub type Seat = usize;

/// Stable identity of a participant across games, matches and tournaments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub u32);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameFormat {
    Constructed,
    Commander,
}

impl GameFormat {
    pub fn label(self) -> &'static str {
        match self {
            GameFormat::Constructed => "Constructed",
            GameFormat::Commander => "Commander",
        }
    }
}

impl fmt::Display for GameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
#[error("unknown game format `{0}` (expected constructed or commander)")]
pub struct UnknownFormat(pub String);

impl FromStr for GameFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "constructed" => Ok(GameFormat::Constructed),
            "commander" => Ok(GameFormat::Commander),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Rules handle passed to the game factory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    pub format: GameFormat,
    /// Games in a best-of-N match
    pub games_per_match: u32,
    pub starting_life: i32,
    /// Turn cap after which a game is declared a draw
    pub max_turns: u32,
}

impl RuleSet {
    pub fn new(format: GameFormat) -> Self {
        let starting_life = match format {
            GameFormat::Constructed => 20,
            GameFormat::Commander => 40,
        };
        Self {
            format,
            games_per_match: 3,
            starting_life,
            max_turns: 200,
        }
    }
}

/// Terminal outcome of one game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    Winner(Seat),
    Draw,
}

/// How much of the game log to emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogVerbosity {
    /// Every log entry
    #[default]
    Full,
    /// Only match-result entries
    ResultsOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogKind {
    Turn,
    Action,
    Damage,
    Elimination,
    MatchResult,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: LogKind,
    pub message: String,
}

impl LogEntry {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Error raised by a rules engine or controller while a game is being played.
///
/// The two variants are deliberately separate types of failure: a recoverable
/// fault only spoils the current attempt, a fatal fault means the engine can
/// no longer be trusted and the whole run must stop.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GameFault {
    #[error("recoverable game error: {0}")]
    Recoverable(String),
    #[error("fatal engine fault: {0}")]
    Fatal(String),
}
