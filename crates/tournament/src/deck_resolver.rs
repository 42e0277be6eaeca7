//! Turns a command-line deck reference into a deck.
//!
//! References are tried against an ordered chain of strategies; the first one
//! that finds a deck wins:
//!
//! 1. catalog id (`moxfield-TdOsPBP3302BdskyLVzU-A`) as `<id>.dck`
//! 2. the same id sanitized into a safe file name
//! 3. a file name ending in a three-letter extension
//! 4. an exact key in the in-memory deck store
//!
//! Only local files are consulted. Nothing is ever downloaded.

use sim_core::{Deck, DeckFileLoader, DeckStore, GameFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::DeckSettings;
use crate::error::ResolutionFailure;

/// Name used when sanitizing leaves nothing behind
pub const PLACEHOLDER_DECK_NAME: &str = "unknown_deck";

/// Does `reference` look like an id from an external deck catalog?
///
/// Catalog ids contain a hyphen, use only `[A-Za-z0-9_-]` and are longer than
/// `min_len`.
pub fn is_catalog_id(reference: &str, min_len: usize) -> bool {
    let trimmed = reference.trim();
    !trimmed.is_empty()
        && reference.contains('-')
        && reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && reference.len() > min_len
}

/// Make `name` safe to use as a file name.
///
/// Total and idempotent: every input maps to a non-empty name over
/// `[A-Za-z0-9_-]`, and sanitizing a sanitized name returns it unchanged.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            c
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        PLACEHOLDER_DECK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// `foo.dck` style reference: a dot followed by exactly three characters.
fn has_file_extension(reference: &str) -> bool {
    matches!(reference.rfind('.'), Some(pos) if pos > 0 && pos + 4 == reference.len())
}

/// Outcome of a single strategy
enum Lookup {
    Found(Deck),
    /// Strategy applied but found nothing; the chain moves on
    Miss,
    /// Strategy does not apply to this reference
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    CatalogId,
    SanitizedCatalogId,
    FileName,
    StoreKey,
}

const CHAIN: [Strategy; 4] = [
    Strategy::CatalogId,
    Strategy::SanitizedCatalogId,
    Strategy::FileName,
    Strategy::StoreKey,
];

pub struct DeckResolver {
    settings: DeckSettings,
    loader: Box<dyn DeckFileLoader>,
    store: Box<dyn DeckStore>,
}

impl DeckResolver {
    pub fn new(
        settings: DeckSettings,
        loader: Box<dyn DeckFileLoader>,
        store: Box<dyn DeckStore>,
    ) -> Self {
        Self {
            settings,
            loader,
            store,
        }
    }

    /// Resolve `reference` for `format`, or explain where we looked.
    pub fn resolve(&self, reference: &str, format: GameFormat) -> Result<Deck, ResolutionFailure> {
        let dir = self.settings.dir_for(format);
        for strategy in CHAIN {
            match self.attempt(strategy, reference, format)? {
                Lookup::Found(deck) => {
                    debug!(reference, ?strategy, deck = %deck.name, "resolved deck");
                    return Ok(deck);
                }
                Lookup::Miss => debug!(reference, ?strategy, "no deck found"),
                Lookup::Skip => {}
            }
        }

        Err(ResolutionFailure {
            reference: reference.to_string(),
            searched: dir.to_path_buf(),
            cause: None,
        })
    }

    fn attempt(
        &self,
        strategy: Strategy,
        reference: &str,
        format: GameFormat,
    ) -> Result<Lookup, ResolutionFailure> {
        let dir = self.settings.dir_for(format);
        let catalog_id = is_catalog_id(reference, self.settings.catalog_id_min_len);
        match strategy {
            Strategy::CatalogId if catalog_id => {
                info!(reference, "catalog deck id detected");
                self.load_if_present(reference, &self.catalog_path(dir, reference))
            }
            Strategy::SanitizedCatalogId if catalog_id => {
                let sanitized = sanitize_filename(reference);
                if sanitized == reference {
                    return Ok(Lookup::Skip);
                }
                self.load_if_present(reference, &self.catalog_path(dir, &sanitized))
            }
            Strategy::FileName if has_file_extension(reference) => {
                let path = if Path::new(reference).is_absolute() {
                    PathBuf::from(reference)
                } else {
                    dir.join(reference)
                };
                self.load_if_present(reference, &path)
            }
            Strategy::StoreKey if !has_file_extension(reference) => {
                Ok(self.store.get(reference, format).map_or(Lookup::Miss, Lookup::Found))
            }
            _ => Ok(Lookup::Skip),
        }
    }

    fn catalog_path(&self, dir: &Path, stem: &str) -> PathBuf {
        dir.join(format!("{}.{}", stem, self.settings.extension))
    }

    /// A missing file is a miss; a file that exists but does not parse stops
    /// the chain, since a later strategy would only hide the broken file.
    fn load_if_present(&self, reference: &str, path: &Path) -> Result<Lookup, ResolutionFailure> {
        if !path.is_file() {
            return Ok(Lookup::Miss);
        }
        info!(path = %path.display(), "loading deck");
        self.loader
            .load(path)
            .map(Lookup::Found)
            .map_err(|cause| ResolutionFailure {
                reference: reference.to_string(),
                searched: path.to_path_buf(),
                cause: Some(cause),
            })
    }

    /// Load every deck file in `dir`, sorted by file name.
    ///
    /// A missing directory yields no decks (with a warning); an unreadable
    /// deck file is a resolution failure.
    pub fn load_directory(&self, dir: &Path) -> Result<Vec<(String, Deck)>, ResolutionFailure> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "deck directory not found");
                return Ok(Vec::new());
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .is_some_and(|ext| ext == self.settings.extension.as_str())
            })
            .collect();
        paths.sort();

        paths
            .into_iter()
            .map(|path| {
                let reference = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.loader
                    .load(&path)
                    .map(|deck| (reference.clone(), deck))
                    .map_err(|cause| ResolutionFailure {
                        reference,
                        searched: path.clone(),
                        cause: Some(cause),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "deck_resolver_tests.rs"]
mod deck_resolver_tests;
