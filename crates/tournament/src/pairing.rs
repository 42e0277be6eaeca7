//! Tournament shapes, pairings, and the pure functions that group players
//! into rounds.

use serde::{Deserialize, Serialize};
use sim_core::ParticipantId;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::TournamentError;
use crate::lineup::ParticipantSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentFormat {
    /// Single elimination
    Bracket,
    RoundRobin,
    Swiss,
}

impl TournamentFormat {
    pub fn label(self) -> &'static str {
        match self {
            TournamentFormat::Bracket => "bracket",
            TournamentFormat::RoundRobin => "roundrobin",
            TournamentFormat::Swiss => "swiss",
        }
    }
}

impl fmt::Display for TournamentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
#[error("unknown tournament type `{0}` (expected bracket, roundrobin or swiss)")]
pub struct UnknownTournamentFormat(pub String);

impl FromStr for TournamentFormat {
    type Err = UnknownTournamentFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bracket" => Ok(TournamentFormat::Bracket),
            "roundrobin" | "round-robin" | "rr" => Ok(TournamentFormat::RoundRobin),
            "swiss" => Ok(TournamentFormat::Swiss),
            _ => Err(UnknownTournamentFormat(s.to_string())),
        }
    }
}

/// A participant entered into a tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentPlayer {
    pub id: ParticipantId,
    /// Registration order, 0-based; lower seeds pair first
    pub seed: u32,
    pub spec: ParticipantSpec,
}

impl TournamentPlayer {
    pub fn new(id: ParticipantId, seed: u32, spec: ParticipantSpec) -> Self {
        Self { id, seed, spec }
    }

    pub fn name(&self) -> &str {
        self.spec
            .display_name
            .as_deref()
            .unwrap_or(&self.spec.deck_reference)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairingId {
    pub round: u32,
    /// Position within the round
    pub index: usize,
}

/// One group of players meeting in a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentPairing {
    id: PairingId,
    players: Vec<TournamentPlayer>,
    bye: bool,
    winner: Option<ParticipantId>,
    abandoned: bool,
}

impl TournamentPairing {
    pub fn new(id: PairingId, players: Vec<TournamentPlayer>, bye: bool) -> Self {
        Self {
            id,
            players,
            bye,
            winner: None,
            abandoned: false,
        }
    }

    pub fn id(&self) -> PairingId {
        self.id
    }

    pub fn round(&self) -> u32 {
        self.id.round
    }

    pub fn players(&self) -> &[TournamentPlayer] {
        &self.players
    }

    pub fn is_bye(&self) -> bool {
        self.bye
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    pub fn winner(&self) -> Option<&TournamentPlayer> {
        let id = self.winner?;
        self.players.iter().find(|p| p.id == id)
    }

    /// Record the winner. Only ever succeeds once per pairing.
    pub fn set_winner(&mut self, id: ParticipantId) -> Result<(), TournamentError> {
        if self.winner.is_some() {
            return Err(TournamentError::WinnerAlreadySet);
        }
        if !self.players.iter().any(|p| p.id == id) {
            return Err(TournamentError::NotInPairing(id));
        }
        self.winner = Some(id);
        Ok(())
    }

    pub fn mark_abandoned(&mut self) {
        self.abandoned = true;
    }

    /// `Burn vs Elves`, or `Burn has a bye`
    pub fn header(&self) -> String {
        let names: Vec<&str> = self.players.iter().map(|p| p.name()).collect();
        if self.bye {
            format!("{} {} a bye", names.join(", "), if names.len() == 1 { "has" } else { "have" })
        } else {
            names.join(" vs ")
        }
    }
}

// =============================================================================
// Grouping
// =============================================================================

/// Groups of positions plus whether each group is a bye.
///
/// A group short of `seats` is a bye, unless it is the only group and still
/// has at least two players, in which case it plays.
pub type Groups = Vec<(Vec<usize>, bool)>;

fn mark_byes(groups: Vec<Vec<usize>>, seats: usize) -> Groups {
    let groups: Vec<Vec<usize>> = groups.into_iter().filter(|g| !g.is_empty()).collect();
    let only = groups.len() == 1;
    groups
        .into_iter()
        .map(|g| {
            let bye = g.len() < seats && !(only && g.len() >= 2);
            (g, bye)
        })
        .collect()
}

/// Consecutive chunks of `seats` positions.
pub fn chunked(count: usize, seats: usize) -> Groups {
    let positions: Vec<usize> = (0..count).collect();
    mark_byes(positions.chunks(seats).map(|c| c.to_vec()).collect(), seats)
}

/// Rounds a single-elimination bracket of `count` players needs.
///
/// Full groups send one player on, a short group sends all of its players.
pub fn bracket_rounds(count: usize, seats: usize) -> u32 {
    if count <= 1 {
        return 0;
    }
    let mut remaining = count;
    let mut rounds = 1;
    while remaining > seats {
        remaining = remaining / seats + remaining % seats;
        rounds += 1;
    }
    rounds
}

/// Every round of a round robin over `count` players, by the circle method.
///
/// Empty slots pad the field to an even count for two seats, otherwise to a
/// multiple of `seats`.
pub fn round_robin_schedule(count: usize, seats: usize) -> Vec<Groups> {
    if count <= 1 {
        return Vec::new();
    }
    let multiple = if seats == 2 { 2 } else { seats };
    let slots = count.div_ceil(multiple) * multiple;
    let mut circle: Vec<Option<usize>> = (0..slots).map(|i| (i < count).then_some(i)).collect();
    let rounds = if slots == seats { 1 } else { slots - 1 };

    let mut schedule = Vec::with_capacity(rounds);
    for _ in 0..rounds {
        let groups: Vec<Vec<usize>> = if seats == 2 {
            (0..slots / 2)
                .map(|i| [circle[i], circle[slots - 1 - i]].into_iter().flatten().collect())
                .collect()
        } else {
            circle
                .chunks(seats)
                .map(|c| c.iter().flatten().copied().collect())
                .collect()
        };
        schedule.push(mark_byes(groups, seats));
        // Slot 0 stays fixed, everyone else moves one place
        circle[1..].rotate_right(1);
    }
    schedule
}

/// Rounds a Swiss tournament of `count` players plays.
pub fn swiss_rounds(count: usize) -> u32 {
    let mut rounds = 0;
    while (1usize << rounds) < count {
        rounds += 1;
    }
    rounds.max(1)
}

/// One Swiss round. `order` is the ranking to pair from; `met` holds pairs of
/// positions that already played each other.
pub fn swiss_round(order: &[usize], seats: usize, met: &HashSet<(usize, usize)>) -> Groups {
    let have_met = |a: usize, b: usize| met.contains(&(a.min(b), a.max(b)));
    let mut remaining: Vec<usize> = order.to_vec();
    let mut groups = Vec::new();

    while !remaining.is_empty() {
        let mut group = vec![remaining.remove(0)];
        // Fresh opponents first
        let mut i = 0;
        while group.len() < seats && i < remaining.len() {
            let candidate = remaining[i];
            if group.iter().all(|&g| !have_met(g, candidate)) {
                group.push(remaining.remove(i));
            } else {
                i += 1;
            }
        }
        // Then whoever is left, in ranking order
        while group.len() < seats && !remaining.is_empty() {
            group.push(remaining.remove(0));
        }
        groups.push(group);
    }
    mark_byes(groups, seats)
}

#[cfg(test)]
#[path = "pairing_tests.rs"]
mod pairing_tests;
