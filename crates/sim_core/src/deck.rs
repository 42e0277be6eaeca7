//! Deck values, the `.dck` text format, and the deck lookup contracts.
//!
//! A `.dck` file looks like:
//!
//! ```text
//! [metadata]
//! Name=Mono Red Burn
//! [main]
//! 4 Lightning Bolt|M10
//! 20 Mountain
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::types::GameFormat;

/// Default extension for deck files on disk
pub const DECK_EXTENSION: &str = "dck";

/// Largest copy count accepted on a single deck line
const MAX_COPIES: u32 = 250;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub name: String,
    /// Damage dealt when the card is played
    pub power: i32,
}

impl Card {
    /// Build a card; its power is derived from the name so that the same list
    /// always produces the same deck.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let sum: u32 = name.bytes().map(u32::from).sum();
        let power = 1 + (sum % 5) as i32;
        Self { name, power }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub name: String,
    /// Main deck, one entry per copy
    pub main: Vec<Card>,
    /// Commander zone (Commander format only)
    pub commander: Vec<Card>,
}

impl Deck {
    pub fn new(name: impl Into<String>, main: Vec<Card>) -> Self {
        Self {
            name: name.into(),
            main,
            commander: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.main.len()
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("failed to read deck file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("deck `{0}` has no cards in its main section")]
    Empty(String),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Metadata,
    Main,
    Commander,
    Ignored,
}

/// Parse deck text. `fallback_name` is used when the metadata has no `Name=`.
pub fn parse_deck(text: &str, fallback_name: &str) -> Result<Deck, DeckError> {
    let mut name: Option<String> = None;
    let mut main = Vec::new();
    let mut commander = Vec::new();
    // Lines before any section header are treated as main deck entries
    let mut section = Section::Main;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = match line[1..line.len() - 1].trim().to_ascii_lowercase().as_str() {
                "metadata" => Section::Metadata,
                "main" => Section::Main,
                "commander" => Section::Commander,
                _ => Section::Ignored,
            };
            continue;
        }

        match section {
            Section::Metadata => {
                if let Some((key, value)) = line.split_once('=')
                    && key.trim().eq_ignore_ascii_case("name")
                {
                    name = Some(value.trim().to_string());
                }
            }
            Section::Main => main.extend(parse_card_line(line, idx + 1)?),
            Section::Commander => commander.extend(parse_card_line(line, idx + 1)?),
            Section::Ignored => {}
        }
    }

    let name = name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| fallback_name.to_string());
    if main.is_empty() {
        return Err(DeckError::Empty(name));
    }

    Ok(Deck {
        name,
        main,
        commander,
    })
}

/// `4 Lightning Bolt|M10` -> four copies of "Lightning Bolt".
fn parse_card_line(line: &str, line_no: usize) -> Result<Vec<Card>, DeckError> {
    let (count, rest) = match line.split_once(char::is_whitespace) {
        Some((count, rest)) if count.chars().all(|c| c.is_ascii_digit()) => (count, rest),
        _ => ("1", line),
    };
    let count: u32 = count.parse().map_err(|_| DeckError::Parse {
        line: line_no,
        message: format!("invalid card count in `{}`", line),
    })?;
    if count == 0 || count > MAX_COPIES {
        return Err(DeckError::Parse {
            line: line_no,
            message: format!("card count {} out of range", count),
        });
    }

    let card_name = rest.split('|').next().unwrap_or_default().trim();
    if card_name.is_empty() {
        return Err(DeckError::Parse {
            line: line_no,
            message: "missing card name".to_string(),
        });
    }

    Ok((0..count).map(|_| Card::new(card_name)).collect())
}

// =============================================================================
// Lookup contracts
// =============================================================================

/// Loads a deck from a file on disk.
pub trait DeckFileLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Deck, DeckError>;
}

/// In-memory deck storage keyed by deck name, one namespace per format.
pub trait DeckStore: Send + Sync {
    fn get(&self, key: &str, format: GameFormat) -> Option<Deck>;
}

/// Loader for the `.dck` text format.
#[derive(Debug, Clone, Copy, Default)]
pub struct DckFileLoader;

impl DeckFileLoader for DckFileLoader {
    fn load(&self, path: &Path) -> Result<Deck, DeckError> {
        let text = std::fs::read_to_string(path).map_err(|source| DeckError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        parse_deck(&text, &stem)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDeckStore {
    decks: HashMap<(GameFormat, String), Deck>,
}

impl MemoryDeckStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `deck` under its own name.
    pub fn insert(&mut self, format: GameFormat, deck: Deck) {
        self.decks.insert((format, deck.name.clone()), deck);
    }

    pub fn len(&self) -> usize {
        self.decks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decks.is_empty()
    }

    /// Index every deck file in `dir` under its deck name.
    ///
    /// Files that fail to parse are skipped with a warning; a missing
    /// directory simply contributes nothing.
    pub fn scan_dir(
        &mut self,
        format: GameFormat,
        dir: &Path,
        extension: &str,
        loader: &dyn DeckFileLoader,
    ) -> usize {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return 0;
        };
        let mut added = 0;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == extension))
            .collect();
        paths.sort();
        for path in paths {
            match loader.load(&path) {
                Ok(deck) => {
                    self.insert(format, deck);
                    added += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable deck"),
            }
        }
        added
    }
}

impl DeckStore for MemoryDeckStore {
    fn get(&self, key: &str, format: GameFormat) -> Option<Deck> {
        self.decks.get(&(format, key.to_string())).cloned()
    }
}

#[cfg(test)]
#[path = "deck_tests.rs"]
mod deck_tests;
