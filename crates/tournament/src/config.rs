//! Simulation settings.
//!
//! One `SimConfig` value is built at startup (TOML file, then CLI overrides)
//! and passed by reference to whatever needs it.

use remote_controller::RemoteOptions;
use serde::{Deserialize, Serialize};
use sim_core::{GameFormat, DECK_EXTENSION};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Settings file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "sim.toml";

/// Largest game worker stack we will ask the OS for
pub const MAX_STACK_SIZE_MB: usize = 4096;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Appended to every player name, to tell parallel runs apart in logs
    pub run_id: Option<String>,
    pub game: GameSettings,
    pub decks: DeckSettings,
    pub remote: RemoteSettings,
    pub faults: FaultPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Wall-clock ceiling for a single game
    pub timeout_secs: u64,
    /// How long a cancelled game may take to notice before it is detached
    pub cancel_grace_ms: u64,
    /// Seed for shuffles and built-in controller decisions
    pub seed: u64,
    /// Stack size of the game worker thread
    pub stack_size_mb: usize,
    /// Turn cap after which a game is a draw
    pub max_turns: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 1200,
            cancel_grace_ms: 5000,
            seed: 0,
            stack_size_mb: 64,
            max_turns: 200,
        }
    }
}

impl GameSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckSettings {
    pub constructed_dir: PathBuf,
    pub commander_dir: PathBuf,
    /// Deck file extension, without the dot
    pub extension: String,
    /// Catalog ids must be longer than this to be recognised as such
    pub catalog_id_min_len: usize,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            constructed_dir: PathBuf::from("decks/constructed"),
            commander_dir: PathBuf::from("decks/commander"),
            extension: DECK_EXTENSION.to_string(),
            catalog_id_min_len: 5,
        }
    }
}

impl DeckSettings {
    pub fn dir_for(&self, format: GameFormat) -> &Path {
        match format {
            GameFormat::Constructed => &self.constructed_dir,
            GameFormat::Commander => &self.commander_dir,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// `host:port` of the decision service
    pub endpoint: String,
    pub connect_timeout_ms: u64,
    pub decision_timeout_ms: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            endpoint: "localhost:7861".to_string(),
            connect_timeout_ms: 5000,
            decision_timeout_ms: 30_000,
        }
    }
}

impl RemoteSettings {
    pub fn options(&self) -> RemoteOptions {
        RemoteOptions {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            decision_timeout: Duration::from_millis(self.decision_timeout_ms),
        }
    }
}

/// Where the line between "retry this game" and "stop everything" sits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultPolicy {
    /// Recoverable game errors tolerated per pairing before it is abandoned
    pub max_recoverable_per_pairing: u32,
    /// Treat recoverable game errors as fatal outside tournaments
    pub escalate_outside_tournament: bool,
}

impl Default for FaultPolicy {
    fn default() -> Self {
        Self {
            max_recoverable_per_pairing: 5,
            escalate_outside_tournament: true,
        }
    }
}

impl SimConfig {
    /// Load configuration from a TOML settings file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// An explicit path must load; otherwise `sim.toml` is used when present
    /// and built-in defaults when not.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game.timeout_secs == 0 {
            return Err(ConfigError::Invalid("game.timeout_secs must be positive".into()));
        }
        if self.game.stack_size_mb == 0 {
            return Err(ConfigError::Invalid("game.stack_size_mb must be positive".into()));
        }
        if self.game.stack_size_mb > MAX_STACK_SIZE_MB {
            return Err(ConfigError::Invalid(format!(
                "game.stack_size_mb must be at most {}, got {}",
                MAX_STACK_SIZE_MB, self.game.stack_size_mb
            )));
        }
        if self.decks.extension.len() != 3 {
            return Err(ConfigError::Invalid(format!(
                "decks.extension must be three characters, got `{}`",
                self.decks.extension
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
