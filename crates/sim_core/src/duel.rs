//! Reference duel ruleset.
//!
//! A deliberately small game so the orchestrator has something real to run:
//! each player starts with a life total and a shuffled library, turns rotate,
//! the active player draws and its controller picks one card to play, and the
//! card deals its power to the next living opponent. Drawing from an empty
//! library deals escalating fatigue damage. The last player standing wins;
//! hitting the turn cap is a draw.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::{
    CancelToken, Card, DecisionView, Game, GameFactory, GameFault, GameFormat, GameOutcome,
    LogEntry, LogKind, LogVerbosity, OpponentView, Participant, RuleSet, Seat, SharedController,
};

/// Cards drawn before the first turn
const OPENING_HAND: usize = 5;

/// Builds duel games. Each game gets its own RNG derived from the factory
/// seed and the game index, so a fixed seed replays identically.
#[derive(Debug, Clone)]
pub struct DuelFactory {
    seed: u64,
}

impl DuelFactory {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl GameFactory for DuelFactory {
    fn create(
        &self,
        rules: &RuleSet,
        participants: &[Participant],
        game_index: u32,
    ) -> Result<Box<dyn Game>, GameFault> {
        if participants.len() < 2 {
            return Err(GameFault::Recoverable(format!(
                "a duel needs at least two players, got {}",
                participants.len()
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(u64::from(game_index)));
        let seats = participants
            .iter()
            .map(|p| {
                let mut library = p.deck.main.clone();
                library.shuffle(&mut rng);
                let mut hand = Vec::with_capacity(OPENING_HAND + p.deck.commander.len());
                if rules.format == GameFormat::Commander {
                    hand.extend(p.deck.commander.iter().cloned());
                }
                for _ in 0..OPENING_HAND {
                    if let Some(card) = library.pop() {
                        hand.push(card);
                    }
                }
                SeatState {
                    name: p.name.clone(),
                    controller: p.controller.clone(),
                    life: rules.starting_life,
                    library,
                    hand,
                    fatigue: 0,
                    eliminated: false,
                }
            })
            .collect();

        // Rotate the starting player between games of a match
        let first = game_index as usize % participants.len();
        Ok(Box::new(DuelGame {
            seats,
            active: first,
            turn: 0,
            max_turns: rules.max_turns,
            outcome: None,
            log: Vec::new(),
        }))
    }
}

struct SeatState {
    name: String,
    controller: SharedController,
    life: i32,
    library: Vec<Card>,
    hand: Vec<Card>,
    fatigue: i32,
    eliminated: bool,
}

pub struct DuelGame {
    seats: Vec<SeatState>,
    active: Seat,
    turn: u32,
    max_turns: u32,
    outcome: Option<GameOutcome>,
    log: Vec<LogEntry>,
}

impl DuelGame {
    fn living(&self) -> impl Iterator<Item = Seat> + '_ {
        self.seats
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.eliminated)
            .map(|(i, _)| i)
    }

    /// Next living seat after `from`, wrapping around.
    fn next_living(&self, from: Seat) -> Option<Seat> {
        let n = self.seats.len();
        (1..n)
            .map(|offset| (from + offset) % n)
            .find(|&seat| !self.seats[seat].eliminated)
    }

    fn finish(&mut self, outcome: GameOutcome) {
        if self.outcome.is_some() {
            return;
        }
        let message = match outcome {
            GameOutcome::Winner(seat) => format!("{} has won!", self.seats[seat].name),
            GameOutcome::Draw => "Game ended in a draw".to_string(),
        };
        self.log.push(LogEntry::new(LogKind::MatchResult, message));
        self.outcome = Some(outcome);
    }

    fn check_game_over(&mut self) {
        let living: Vec<Seat> = self.living().collect();
        match living.as_slice() {
            [] => self.finish(GameOutcome::Draw),
            [winner] => self.finish(GameOutcome::Winner(*winner)),
            _ => {}
        }
    }

    fn damage(&mut self, seat: Seat, amount: i32) {
        let target = &mut self.seats[seat];
        target.life -= amount;
        if target.life <= 0 && !target.eliminated {
            target.eliminated = true;
            let message = format!("{} has been eliminated", target.name);
            self.log.push(LogEntry::new(LogKind::Elimination, message));
        }
    }

    fn play_turn(&mut self) -> Result<(), GameFault> {
        self.turn += 1;
        let seat = self.active;
        self.log.push(LogEntry::new(
            LogKind::Turn,
            format!("Turn {} ({})", self.turn, self.seats[seat].name),
        ));

        // Draw step
        let drawn = self.seats[seat].library.pop();
        match drawn {
            Some(card) => self.seats[seat].hand.push(card),
            None => {
                self.seats[seat].fatigue += 1;
                let fatigue = self.seats[seat].fatigue;
                self.log.push(LogEntry::new(
                    LogKind::Damage,
                    format!("{} takes {} fatigue damage", self.seats[seat].name, fatigue),
                ));
                self.damage(seat, fatigue);
                if self.seats[seat].eliminated {
                    return Ok(());
                }
            }
        }

        let view = DecisionView {
            player: self.seats[seat].name.clone(),
            turn: self.turn,
            life: self.seats[seat].life,
            opponents: self
                .living()
                .filter(|&s| s != seat)
                .map(|s| OpponentView {
                    seat: s,
                    name: self.seats[s].name.clone(),
                    life: self.seats[s].life,
                })
                .collect(),
            hand: self.seats[seat].hand.clone(),
        };

        let choice = {
            let mut controller = self.seats[seat]
                .controller
                .lock()
                .map_err(|_| GameFault::Fatal("controller lock poisoned".to_string()))?;
            controller.choose(&view)?
        };

        let Some(index) = choice else {
            self.log.push(LogEntry::new(
                LogKind::Action,
                format!("{} passes", self.seats[seat].name),
            ));
            return Ok(());
        };
        if index >= self.seats[seat].hand.len() {
            self.log.push(LogEntry::new(
                LogKind::Action,
                format!(
                    "{} chose card {} of {}, treated as a pass",
                    self.seats[seat].name,
                    index,
                    self.seats[seat].hand.len()
                ),
            ));
            return Ok(());
        }

        let card = self.seats[seat].hand.remove(index);
        let Some(target) = self.next_living(seat) else {
            return Ok(());
        };
        self.log.push(LogEntry::new(
            LogKind::Action,
            format!(
                "{} plays {} for {} damage to {}",
                self.seats[seat].name, card.name, card.power, self.seats[target].name
            ),
        ));
        self.damage(target, card.power);
        Ok(())
    }
}

impl Game for DuelGame {
    fn start(&mut self, cancel: &CancelToken) -> Result<(), GameFault> {
        for seat in &self.seats {
            seat.controller
                .lock()
                .map_err(|_| GameFault::Fatal("controller lock poisoned".to_string()))?
                .new_game();
        }

        while self.outcome.is_none() {
            if cancel.is_cancelled() {
                return Ok(());
            }
            if self.turn >= self.max_turns {
                self.finish(GameOutcome::Draw);
                break;
            }

            self.play_turn()?;
            self.check_game_over();

            if self.outcome.is_none()
                && let Some(next) = self.next_living(self.active)
            {
                self.active = next;
            }
        }
        Ok(())
    }

    fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    fn force_draw(&mut self) {
        self.finish(GameOutcome::Draw);
    }

    fn log(&self, verbosity: LogVerbosity) -> Vec<LogEntry> {
        self.log
            .iter()
            .filter(|e| verbosity == LogVerbosity::Full || e.kind == LogKind::MatchResult)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "duel_tests.rs"]
mod duel_tests;
