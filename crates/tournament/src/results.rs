//! Match and tournament results storage and reporting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::TournamentError;
use crate::match_runner::MatchConfig;
use crate::orchestrator::PairingOutcome;
use crate::pairing::{TournamentFormat, TournamentPairing};
use crate::scheduler::{GameSummary, MatchResult};
use crate::tournament::Tournament;

#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Complete results of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentResults {
    /// Name/description of the run
    pub name: String,
    /// `None` for a single match
    pub format: Option<TournamentFormat>,
    pub created_at: DateTime<Utc>,
    /// Participating players
    pub participants: Vec<String>,
    /// Every match (and bye), in play order
    pub matches: Vec<MatchEntry>,
    /// Final ranking, best first
    pub standings: Vec<StandingEntry>,
    pub champion: Option<String>,
    /// Configuration used
    pub config: ResultsConfig,
}

/// A single match entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchEntry {
    pub round: Option<u32>,
    pub players: Vec<String>,
    pub winner: Option<String>,
    pub bye: bool,
    pub abandoned: bool,
    /// Recoverable errors absorbed while playing
    pub faults: u32,
    pub games: Vec<GameSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingEntry {
    pub rank: usize,
    pub player: String,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub byes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsConfig {
    pub format: String,
    pub games_per_match: u32,
    pub players_per_match: usize,
}

impl TournamentResults {
    pub fn new(
        name: &str,
        format: Option<TournamentFormat>,
        participants: Vec<String>,
        config: ResultsConfig,
    ) -> Self {
        Self {
            name: name.to_string(),
            format,
            created_at: Utc::now(),
            participants,
            matches: Vec::new(),
            standings: Vec::new(),
            champion: None,
            config,
        }
    }

    /// Results of a single match
    pub fn for_match(config: &MatchConfig, outcome: &PairingOutcome) -> Self {
        let names: Vec<String> = config.participants.iter().map(|p| p.name.clone()).collect();
        let mut results = Self::new(
            &config.players_label(),
            None,
            names.clone(),
            ResultsConfig {
                format: config.rules.format.to_string(),
                games_per_match: config.games_per_match,
                players_per_match: config.participants.len(),
            },
        );
        let winner = outcome.result.winner.and_then(|id| {
            config
                .participants
                .iter()
                .find(|p| p.id == id)
                .map(|p| p.name.clone())
        });
        results.champion = winner.clone();
        results.matches.push(MatchEntry {
            round: None,
            players: names,
            winner,
            bye: false,
            abandoned: outcome.abandoned,
            faults: outcome.faults,
            games: outcome.result.summaries(),
        });
        results
    }

    /// Add a played tournament pairing
    pub fn add_pairing(&mut self, pairing: &TournamentPairing, outcome: &PairingOutcome) {
        self.matches.push(MatchEntry {
            round: Some(pairing.round()),
            players: pairing.players().iter().map(|p| p.name().to_string()).collect(),
            winner: pairing.winner().map(|p| p.name().to_string()),
            bye: false,
            abandoned: pairing.is_abandoned(),
            faults: outcome.faults,
            games: outcome.result.summaries(),
        });
    }

    pub fn add_bye(&mut self, pairing: &TournamentPairing) {
        self.matches.push(MatchEntry {
            round: Some(pairing.round()),
            players: pairing.players().iter().map(|p| p.name().to_string()).collect(),
            winner: None,
            bye: true,
            abandoned: false,
            faults: 0,
            games: Vec::new(),
        });
    }

    /// Copy the final ranking out of a complete tournament
    pub fn finish(&mut self, tournament: &Tournament) -> Result<(), TournamentError> {
        self.standings = tournament
            .results()?
            .into_iter()
            .enumerate()
            .map(|(i, s)| StandingEntry {
                rank: i + 1,
                player: s.player.name().to_string(),
                wins: s.wins,
                losses: s.losses,
                draws: s.draws,
                byes: s.byes,
            })
            .collect();
        self.champion = tournament.winner().map(|p| p.name().to_string());
        Ok(())
    }

    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> Result<(), ResultsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| ResultsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> Result<Self, ResultsError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ResultsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Generate a text report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();
        report.push_str(&format!("=== Results: {} ===\n\n", self.name));
        report.push_str(&format!("Participants: {}\n", self.participants.join(", ")));
        report.push_str(&format!(
            "Config: {}, {} games/match, {} players/match\n\n",
            self.config.format, self.config.games_per_match, self.config.players_per_match
        ));

        report.push_str("Matches:\n");
        report.push_str(&format!(
            "{:<6} {:<44} {:<20} {:>5}\n",
            "Round", "Players", "Winner", "Games"
        ));
        report.push_str(&"-".repeat(78));
        report.push('\n');
        for entry in &self.matches {
            let round = entry.round.map(|r| r.to_string()).unwrap_or_else(|| "-".into());
            let winner = if entry.bye {
                "(bye)".to_string()
            } else if entry.abandoned {
                format!("{} (abandoned)", entry.winner.as_deref().unwrap_or("none"))
            } else {
                entry.winner.clone().unwrap_or_else(|| "none".into())
            };
            report.push_str(&format!(
                "{:<6} {:<44} {:<20} {:>5}\n",
                round,
                entry.players.join(" vs "),
                winner,
                entry.games.len()
            ));
        }

        if !self.standings.is_empty() {
            report.push_str("\nStandings:\n");
            report.push_str(&format!(
                "{:<5} {:<30} {:>5} {:>5} {:>5} {:>5}\n",
                "Rank", "Player", "W", "L", "D", "Bye"
            ));
            report.push_str(&"-".repeat(60));
            report.push('\n');
            for s in &self.standings {
                report.push_str(&format!(
                    "{:<5} {:<30} {:>5} {:>5} {:>5} {:>5}\n",
                    s.rank, s.player, s.wins, s.losses, s.draws, s.byes
                ));
            }
        }

        if let Some(champion) = &self.champion {
            report.push_str(&format!("\nWinner: {}\n", champion));
        }
        report
    }
}

/// Decisive wins per player of a single match, for the closing summary
pub fn match_score(config: &MatchConfig, result: &MatchResult) -> String {
    let mut parts: Vec<String> = config
        .participants
        .iter()
        .map(|p| format!("{} {}", p.name, result.wins_for(p.id)))
        .collect();
    parts.push(format!("draws {}", result.draws()));
    parts.join(", ")
}

#[cfg(test)]
#[path = "results_tests.rs"]
mod results_tests;
