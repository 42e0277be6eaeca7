//! Controller assignment: which kind of agent sits in which seat, and how it
//! gets built.

use random_controller::RandomController;
use remote_controller::{RemoteController, RemoteOptions};
use serde::{Deserialize, Serialize};
use sim_core::Controller;
use std::fmt;
use tracing::{info, warn};

use crate::error::ControllerError;

/// The closed set of controller kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ControllerKind {
    /// Built-in strategy
    #[default]
    Default,
    /// Remote decision service
    Alternate,
}

impl ControllerKind {
    /// Parse a command-line token. Unknown tokens fall back to `Default`.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "ai" | "default" => ControllerKind::Default,
            "llm" | "remote" | "alternate" => ControllerKind::Alternate,
            other => {
                warn!(token = other, "unknown controller type, using the default");
                ControllerKind::Default
            }
        }
    }

    /// Prefix used in single-match player names
    pub fn name_prefix(self) -> &'static str {
        match self {
            ControllerKind::Default => "Ai",
            ControllerKind::Alternate => "LLM",
        }
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerKind::Default => f.write_str("default"),
            ControllerKind::Alternate => f.write_str("alternate"),
        }
    }
}

/// Controller selection as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerSpec {
    /// One token applied to every seat
    Broadcast(ControllerKind),
    /// One token per seat; seats past the end use the first token
    Positional(Vec<ControllerKind>),
}

impl Default for ControllerSpec {
    fn default() -> Self {
        ControllerSpec::Positional(Vec::new())
    }
}

impl ControllerSpec {
    /// `["llm"]` broadcasts, `["llm", "ai"]` and `["llm,ai"]` are positional.
    pub fn parse(values: &[String]) -> Self {
        match values {
            [single] if single.contains(',') => ControllerSpec::Positional(
                single
                    .split(',')
                    .filter(|t| !t.trim().is_empty())
                    .map(ControllerKind::from_token)
                    .collect(),
            ),
            [single] => ControllerSpec::Broadcast(ControllerKind::from_token(single)),
            many => ControllerSpec::Positional(
                many.iter().map(|t| ControllerKind::from_token(t)).collect(),
            ),
        }
    }
}

/// Controller kind for the seat at `index` (0-based).
pub fn assign(index: usize, spec: &ControllerSpec) -> ControllerKind {
    match spec {
        ControllerSpec::Broadcast(kind) => *kind,
        ControllerSpec::Positional(kinds) => kinds
            .get(index)
            .or_else(|| kinds.first())
            .copied()
            .unwrap_or_default(),
    }
}

/// Display name for a seat: `Ai(1)-Burn`, `LLM(2)-Elves-run7`, or for
/// tournament entrants just the deck name.
pub fn player_name(
    seat: Option<(usize, ControllerKind)>,
    deck_name: &str,
    run_id: Option<&str>,
) -> String {
    let mut name = match seat {
        Some((index, kind)) => format!("{}({})-{}", kind.name_prefix(), index + 1, deck_name),
        None => deck_name.to_string(),
    };
    if let Some(run_id) = run_id.filter(|r| !r.is_empty()) {
        name.push('-');
        name.push_str(run_id);
    }
    name
}

/// Constructs agents of each kind.
pub trait ControllerFactory: Send + Sync {
    fn create_default(&self, name: &str, seed_index: u64) -> Box<dyn Controller>;

    fn create_alternate(
        &self,
        name: &str,
        endpoint: &str,
    ) -> Result<Box<dyn Controller>, ControllerError>;
}

/// Random controllers for the default kind, TCP clients for the alternate kind.
pub struct StandardControllers {
    seed: u64,
    remote: RemoteOptions,
}

impl StandardControllers {
    pub fn new(seed: u64, remote: RemoteOptions) -> Self {
        Self { seed, remote }
    }
}

impl ControllerFactory for StandardControllers {
    fn create_default(&self, name: &str, seed_index: u64) -> Box<dyn Controller> {
        Box::new(RandomController::new(name, self.seed.wrapping_add(seed_index)))
    }

    fn create_alternate(
        &self,
        name: &str,
        endpoint: &str,
    ) -> Result<Box<dyn Controller>, ControllerError> {
        info!(player = name, endpoint, "creating remote controller");
        let controller = RemoteController::connect(name, endpoint, self.remote).map_err(
            |source| ControllerError::Remote {
                player: name.to_string(),
                source,
            },
        )?;
        Ok(Box::new(controller))
    }
}

/// Maps a controller kind to its constructor.
pub struct ControllerRegistry {
    factory: Box<dyn ControllerFactory>,
    endpoint: String,
}

impl ControllerRegistry {
    pub fn new(factory: Box<dyn ControllerFactory>, endpoint: impl Into<String>) -> Self {
        Self {
            factory,
            endpoint: endpoint.into(),
        }
    }

    /// A remote connection failure is returned as is; it never degrades to
    /// the default kind.
    pub fn build(
        &self,
        kind: ControllerKind,
        name: &str,
        seed_index: u64,
    ) -> Result<Box<dyn Controller>, ControllerError> {
        match kind {
            ControllerKind::Default => Ok(self.factory.create_default(name, seed_index)),
            ControllerKind::Alternate => self.factory.create_alternate(name, &self.endpoint),
        }
    }
}

#[cfg(test)]
#[path = "controllers_tests.rs"]
mod controllers_tests;
