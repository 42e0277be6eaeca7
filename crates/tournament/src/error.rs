//! Error taxonomy for the orchestrator.
//!
//! `FatalFault` is its own type and never a variant of a recoverable error:
//! code that handles `AttemptError::Recoverable` cannot accidentally swallow a
//! crash, because a crash arrives as `AttemptError::Fatal` and every layer
//! above the runner forwards it unchanged.

use remote_controller::RemoteError;
use sim_core::{DeckError, ParticipantId};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A deck reference that could not be turned into a deck.
#[derive(Debug, Error)]
#[error("could not load deck `{reference}` (searched {})", .searched.display())]
pub struct ResolutionFailure {
    pub reference: String,
    /// Directory (or file) that was searched last
    pub searched: PathBuf,
    #[source]
    pub cause: Option<DeckError>,
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("could not create controller for {player}: {source}")]
    Remote {
        player: String,
        #[source]
        source: RemoteError,
    },
}

/// Anything that stops a match from being set up.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Deck(#[from] ResolutionFailure),
    #[error(transparent)]
    Controller(#[from] ControllerError),
    #[error("a match needs at least two players, got {0}")]
    NotEnoughPlayers(usize),
    #[error("unknown participant {0}")]
    UnknownParticipant(ParticipantId),
}

/// An unrecoverable fault. The run must stop and the process exit non-zero.
#[derive(Debug, Error)]
#[error("game {game} crashed after {elapsed:?} ({players}): {reason}")]
pub struct FatalFault {
    /// 1-based game number within the match
    pub game: u32,
    pub players: String,
    pub elapsed: Duration,
    pub reason: String,
}

/// Why a single game attempt produced no counted result.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The attempt is discarded; the caller decides whether to retry.
    #[error("game {game} threw: {message}")]
    Recoverable { game: u32, message: String },
    #[error(transparent)]
    Fatal(#[from] FatalFault),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TournamentError {
    #[error("tournament has already been initialized")]
    AlreadyInitialized,
    #[error("tournament is not active")]
    NotActive,
    #[error("tournament is not complete yet")]
    NotComplete,
    #[error("tournament has no players")]
    NoPlayers,
    #[error("a match needs at least two seats, got {0}")]
    TooFewSeats(usize),
    #[error("pairing {index} of round {round} does not belong to the active round")]
    UnknownPairing { round: u32, index: usize },
    #[error("pairing {index} of round {round} was not handed out yet")]
    NotIssued { round: u32, index: usize },
    #[error("pairing {index} of round {round} was already reported")]
    AlreadyReported { round: u32, index: usize },
    #[error("pairing already has a winner")]
    WinnerAlreadySet,
    #[error("player {0} is not part of this pairing")]
    NotInPairing(ParticipantId),
}

/// Failure of a whole run, as seen by the binary.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Fatal(#[from] FatalFault),
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error(transparent)]
    Tournament(#[from] TournamentError),
}
