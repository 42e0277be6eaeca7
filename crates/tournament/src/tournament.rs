//! Tournament engine
//!
//! Owns the tournament state: which round is active, which pairings have
//! been handed out and reported, and how players stand. The orchestrator
//! pulls pairings with [`Tournament::next_pairing`], plays them, and hands
//! them back through [`Tournament::report_completion`]; the engine moves to
//! the next round once every pairing of the active round is back.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::TournamentError;
use crate::pairing::{
    bracket_rounds, chunked, round_robin_schedule, swiss_round, swiss_rounds, Groups, PairingId,
    TournamentFormat, TournamentPairing, TournamentPlayer,
};

/// Running record of one player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub player: TournamentPlayer,
    pub wins: u32,
    pub losses: u32,
    /// Pairings that ended without a winner
    pub draws: u32,
    pub byes: u32,
    /// Bracket round the player went out in
    pub eliminated_in: Option<u32>,
}

impl Standing {
    fn new(player: TournamentPlayer) -> Self {
        Self {
            player,
            wins: 0,
            losses: 0,
            draws: 0,
            byes: 0,
            eliminated_in: None,
        }
    }

    /// A bye counts as a win
    pub fn points(&self) -> u32 {
        self.wins + self.byes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotInitialized,
    Active,
    Complete,
}

pub struct Tournament {
    format: TournamentFormat,
    seats: usize,
    phase: Phase,
    round: u32,
    total_rounds: u32,
    standings: Vec<Standing>,
    /// Active round
    pairings: Vec<TournamentPairing>,
    issued: usize,
    reported: Vec<bool>,
    /// Every reported pairing, in report order
    history: Vec<TournamentPairing>,
    /// Precomputed round-robin rounds
    schedule: Vec<Groups>,
    /// Positions that already met, smaller position first
    met: HashSet<(usize, usize)>,
    /// Bracket players moving on, in pairing order
    advancing: Vec<usize>,
    champion: Option<usize>,
}

impl Tournament {
    pub fn new(format: TournamentFormat) -> Self {
        Self {
            format,
            seats: 2,
            phase: Phase::NotInitialized,
            round: 0,
            total_rounds: 0,
            standings: Vec::new(),
            pairings: Vec::new(),
            issued: 0,
            reported: Vec::new(),
            history: Vec::new(),
            schedule: Vec::new(),
            met: HashSet::new(),
            advancing: Vec::new(),
            champion: None,
        }
    }

    pub fn format(&self) -> TournamentFormat {
        self.format
    }

    /// Register players and build the first round.
    pub fn initialize(
        &mut self,
        players: Vec<TournamentPlayer>,
        seats: usize,
    ) -> Result<(), TournamentError> {
        if self.phase != Phase::NotInitialized {
            return Err(TournamentError::AlreadyInitialized);
        }
        if seats < 2 {
            return Err(TournamentError::TooFewSeats(seats));
        }
        if players.is_empty() {
            return Err(TournamentError::NoPlayers);
        }

        self.seats = seats;
        self.standings = players.into_iter().map(Standing::new).collect();
        let count = self.standings.len();

        if count == 1 {
            info!("single entrant, tournament is decided without a game");
            self.champion = Some(0);
            self.phase = Phase::Complete;
            return Ok(());
        }

        let seed_order = self.seed_order();
        let first = match self.format {
            TournamentFormat::Bracket => {
                self.total_rounds = bracket_rounds(count, seats);
                Self::remap(chunked(count, seats), &seed_order)
            }
            TournamentFormat::RoundRobin => {
                self.schedule = round_robin_schedule(count, seats);
                self.total_rounds = self.schedule.len() as u32;
                let first = self.schedule[0].clone();
                Self::remap(first, &seed_order)
            }
            TournamentFormat::Swiss => {
                self.total_rounds = swiss_rounds(count);
                swiss_round(&seed_order, seats, &self.met)
            }
        };

        self.phase = Phase::Active;
        self.start_round(1, first);
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    /// 1-based number of the active round; 0 before the first round.
    pub fn active_round(&self) -> u32 {
        self.round
    }

    pub fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    pub fn active_pairings(&self) -> &[TournamentPairing] {
        &self.pairings
    }

    pub fn history(&self) -> &[TournamentPairing] {
        &self.history
    }

    /// Hand out the next pairing of the active round.
    ///
    /// `None` once the tournament is complete or while handed-out pairings of
    /// the active round are still unreported.
    pub fn next_pairing(&mut self) -> Result<Option<TournamentPairing>, TournamentError> {
        match self.phase {
            Phase::NotInitialized => Err(TournamentError::NotActive),
            Phase::Complete => Ok(None),
            Phase::Active => {
                let next = self.pairings.get(self.issued).cloned();
                if next.is_some() {
                    self.issued += 1;
                }
                Ok(next)
            }
        }
    }

    /// Record a played (or abandoned, or bye) pairing.
    ///
    /// A bye without a winner resolves to its first player.
    pub fn report_completion(&mut self, pairing: TournamentPairing) -> Result<(), TournamentError> {
        if self.phase != Phase::Active {
            return Err(TournamentError::NotActive);
        }
        let PairingId { round, index } = pairing.id();
        let unknown = TournamentError::UnknownPairing { round, index };
        if round != self.round {
            return Err(unknown);
        }
        match self.pairings.get(index) {
            Some(stored) if stored.players() == pairing.players() => {}
            _ => return Err(unknown),
        }
        if index >= self.issued {
            return Err(TournamentError::NotIssued { round, index });
        }
        if self.reported[index] {
            return Err(TournamentError::AlreadyReported { round, index });
        }

        let mut pairing = pairing;
        if pairing.is_bye() && pairing.winner().is_none() {
            if let Some(first) = pairing.players().first().map(|p| p.id) {
                pairing.set_winner(first)?;
            }
        }
        self.apply(&pairing);
        debug!(
            round,
            index,
            winner = pairing.winner().map(|p| p.name()).unwrap_or("-"),
            abandoned = pairing.is_abandoned(),
            "pairing reported"
        );

        self.pairings[index] = pairing.clone();
        self.reported[index] = true;
        self.history.push(pairing);

        if self.reported.iter().all(|&r| r) {
            self.advance();
        }
        Ok(())
    }

    /// Final ranking, best first.
    pub fn results(&self) -> Result<Vec<Standing>, TournamentError> {
        if self.phase != Phase::Complete {
            return Err(TournamentError::NotComplete);
        }
        let mut ranked: Vec<(usize, &Standing)> = self.standings.iter().enumerate().collect();
        match self.format {
            TournamentFormat::Bracket => ranked.sort_by_key(|(pos, s)| {
                (
                    Reverse(self.champion == Some(*pos)),
                    Reverse(s.eliminated_in.unwrap_or(u32::MAX)),
                    Reverse(s.wins),
                    s.player.seed,
                )
            }),
            TournamentFormat::RoundRobin | TournamentFormat::Swiss => {
                ranked.sort_by_key(|(_, s)| (Reverse(s.points()), Reverse(s.draws), s.losses, s.player.seed))
            }
        }
        Ok(ranked.into_iter().map(|(_, s)| s.clone()).collect())
    }

    /// Bracket champion, or the player strictly ahead on points.
    pub fn winner(&self) -> Option<&TournamentPlayer> {
        if self.phase != Phase::Complete {
            return None;
        }
        if self.format == TournamentFormat::Bracket || self.standings.len() == 1 {
            return self.champion.map(|pos| &self.standings[pos].player);
        }
        let top = self.standings.iter().map(Standing::points).max()?;
        let mut leaders = self.standings.iter().filter(|s| s.points() == top);
        match (leaders.next(), leaders.next()) {
            (Some(leader), None) => Some(&leader.player),
            _ => None,
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn position_of(&self, player: &TournamentPlayer) -> Option<usize> {
        self.standings.iter().position(|s| s.player.id == player.id)
    }

    fn seed_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.standings.len()).collect();
        order.sort_by_key(|&pos| self.standings[pos].player.seed);
        order
    }

    /// Translate groups over `pool` indices into player positions
    fn remap(groups: Groups, pool: &[usize]) -> Groups {
        groups
            .into_iter()
            .map(|(group, bye)| (group.into_iter().map(|i| pool[i]).collect(), bye))
            .collect()
    }

    fn start_round(&mut self, round: u32, groups: Groups) {
        self.round = round;
        self.pairings = groups
            .into_iter()
            .enumerate()
            .map(|(index, (group, bye))| {
                let players = group
                    .into_iter()
                    .map(|pos| self.standings[pos].player.clone())
                    .collect();
                TournamentPairing::new(PairingId { round, index }, players, bye)
            })
            .collect();
        self.issued = 0;
        self.reported = vec![false; self.pairings.len()];
        info!(
            round,
            total = self.total_rounds,
            pairings = self.pairings.len(),
            "round started"
        );
    }

    fn apply(&mut self, pairing: &TournamentPairing) {
        let positions: Vec<usize> = pairing
            .players()
            .iter()
            .filter_map(|p| self.position_of(p))
            .collect();
        let bracket = self.format == TournamentFormat::Bracket;

        if pairing.is_bye() {
            for &pos in &positions {
                if bracket {
                    self.advancing.push(pos);
                } else {
                    self.standings[pos].byes += 1;
                }
            }
            return;
        }

        for (i, &a) in positions.iter().enumerate() {
            for &b in &positions[i + 1..] {
                self.met.insert((a.min(b), a.max(b)));
            }
        }

        let winner = pairing.winner().and_then(|p| self.position_of(p));
        for &pos in &positions {
            let standing = &mut self.standings[pos];
            match winner {
                Some(w) if w == pos => standing.wins += 1,
                Some(_) => standing.losses += 1,
                None => standing.draws += 1,
            }
            if bracket && winner != Some(pos) {
                standing.eliminated_in = Some(self.round);
            }
        }
        if bracket {
            if let Some(w) = winner {
                self.advancing.push(w);
            }
        }
    }

    fn advance(&mut self) {
        let next_round = self.round + 1;
        let next = match self.format {
            TournamentFormat::Bracket => {
                let advancing = std::mem::take(&mut self.advancing);
                if advancing.len() <= 1 {
                    self.champion = advancing.first().copied();
                    None
                } else {
                    Some(Self::remap(chunked(advancing.len(), self.seats), &advancing))
                }
            }
            TournamentFormat::RoundRobin => self
                .schedule
                .get(self.round as usize)
                .cloned()
                .map(|groups| Self::remap(groups, &self.seed_order())),
            TournamentFormat::Swiss if self.round < self.total_rounds => {
                let mut order = self.seed_order();
                order.sort_by_key(|&pos| Reverse(self.standings[pos].points()));
                Some(swiss_round(&order, self.seats, &self.met))
            }
            TournamentFormat::Swiss => None,
        };

        match next {
            Some(groups) => self.start_round(next_round, groups),
            None => {
                self.phase = Phase::Complete;
                info!(round = self.round, format = %self.format, "tournament complete");
            }
        }
    }
}

#[cfg(test)]
#[path = "tournament_tests.rs"]
mod tournament_tests;
