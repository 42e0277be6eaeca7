//! Turns command-line participant descriptions into ready-to-play seats.

use serde::{Deserialize, Serialize};
use sim_core::{share_controller, Deck, GameFormat, Participant, ParticipantId};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::controllers::{assign, player_name, ControllerKind, ControllerRegistry, ControllerSpec};
use crate::deck_resolver::DeckResolver;
use crate::error::SetupError;

/// One seat as described by the user. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSpec {
    pub deck_reference: String,
    pub controller_kind: ControllerKind,
    /// Overrides the generated player name
    pub display_name: Option<String>,
}

impl ParticipantSpec {
    pub fn new(deck_reference: impl Into<String>, controller_kind: ControllerKind) -> Self {
        Self {
            deck_reference: deck_reference.into(),
            controller_kind,
            display_name: None,
        }
    }
}

/// One spec per deck reference, controllers assigned by position.
pub fn specs_for(decks: &[String], controllers: &ControllerSpec) -> Vec<ParticipantSpec> {
    decks
        .iter()
        .enumerate()
        .map(|(i, deck)| ParticipantSpec::new(deck.clone(), assign(i, controllers)))
        .collect()
}

/// How a participant is named
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Naming {
    /// `Ai(n)-Deck` for seat `n` of a single match
    Seat(usize),
    /// Plain deck name for tournament entrants
    Entrant,
}

pub struct LineupBuilder<'a> {
    resolver: &'a DeckResolver,
    registry: &'a ControllerRegistry,
    format: GameFormat,
    run_id: Option<&'a str>,
}

impl<'a> LineupBuilder<'a> {
    pub fn new(
        resolver: &'a DeckResolver,
        registry: &'a ControllerRegistry,
        format: GameFormat,
        run_id: Option<&'a str>,
    ) -> Self {
        Self {
            resolver,
            registry,
            format,
            run_id,
        }
    }

    /// Seats for a single match. Every deck must resolve; no seat is skipped.
    pub fn match_seats(&self, specs: &[ParticipantSpec]) -> Result<Vec<Participant>, SetupError> {
        if specs.len() < 2 {
            return Err(SetupError::NotEnoughPlayers(specs.len()));
        }
        specs
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let deck = self.resolver.resolve(&spec.deck_reference, self.format)?;
                self.seat(i, spec, deck, Naming::Seat(i))
            })
            .collect()
    }

    /// Tournament entrants from deck references.
    ///
    /// Returns the specs with their display names filled in, alongside the
    /// built participants.
    pub fn entrants(
        &self,
        specs: &[ParticipantSpec],
    ) -> Result<(Vec<ParticipantSpec>, Vec<Participant>), SetupError> {
        let resolved = self.resolve_all(specs)?;
        self.enter(resolved)
    }

    /// Tournament entrants from every deck file in `dir`.
    pub fn directory_entrants(
        &self,
        dir: &Path,
        controllers: &ControllerSpec,
    ) -> Result<(Vec<ParticipantSpec>, Vec<Participant>), SetupError> {
        let resolved = self.directory_decks(dir, controllers, 0)?;
        self.enter(resolved)
    }

    /// Deck references first, then every deck file in `dir`. Seeds and
    /// controller positions continue from one list into the next.
    pub fn combined_entrants(
        &self,
        decks: &[String],
        dir: Option<&Path>,
        controllers: &ControllerSpec,
    ) -> Result<(Vec<ParticipantSpec>, Vec<Participant>), SetupError> {
        let mut resolved = self.resolve_all(&specs_for(decks, controllers))?;
        if let Some(dir) = dir {
            let offset = resolved.len();
            resolved.extend(self.directory_decks(dir, controllers, offset)?);
        }
        self.enter(resolved)
    }

    fn resolve_all(&self, specs: &[ParticipantSpec]) -> Result<Vec<(ParticipantSpec, Deck)>, SetupError> {
        specs
            .iter()
            .map(|spec| {
                let deck = self.resolver.resolve(&spec.deck_reference, self.format)?;
                Ok((spec.clone(), deck))
            })
            .collect()
    }

    fn directory_decks(
        &self,
        dir: &Path,
        controllers: &ControllerSpec,
        offset: usize,
    ) -> Result<Vec<(ParticipantSpec, Deck)>, SetupError> {
        let decks = self.resolver.load_directory(dir)?;
        info!(dir = %dir.display(), decks = decks.len(), "loaded deck directory");
        Ok(decks
            .into_iter()
            .enumerate()
            .map(|(i, (reference, deck))| {
                (ParticipantSpec::new(reference, assign(offset + i, controllers)), deck)
            })
            .collect())
    }

    fn enter(
        &self,
        resolved: Vec<(ParticipantSpec, Deck)>,
    ) -> Result<(Vec<ParticipantSpec>, Vec<Participant>), SetupError> {
        let mut named = Vec::with_capacity(resolved.len());
        let mut participants = Vec::with_capacity(resolved.len());
        for (i, (spec, deck)) in resolved.into_iter().enumerate() {
            let participant = self.seat(i, &spec, deck, Naming::Entrant)?;
            named.push(ParticipantSpec {
                display_name: Some(participant.name.clone()),
                ..spec
            });
            participants.push(participant);
        }
        Ok((named, participants))
    }

    fn seat(
        &self,
        index: usize,
        spec: &ParticipantSpec,
        deck: Deck,
        naming: Naming,
    ) -> Result<Participant, SetupError> {
        let name = match &spec.display_name {
            Some(name) => name.clone(),
            None => {
                let seat = match naming {
                    Naming::Seat(i) => Some((i, spec.controller_kind)),
                    Naming::Entrant => None,
                };
                player_name(seat, &deck.name, self.run_id)
            }
        };
        let controller = self
            .registry
            .build(spec.controller_kind, &name, index as u64)?;
        info!(player = %name, kind = %spec.controller_kind, deck = %deck.name, "seat ready");

        Ok(Participant {
            id: ParticipantId(index as u32),
            name,
            deck: Arc::new(deck),
            controller: share_controller(controller),
        })
    }
}

#[cfg(test)]
#[path = "lineup_tests.rs"]
mod lineup_tests;
