pub mod cancel;
pub mod deck;
pub mod duel;
pub mod types;

// Re-export the collaborator surface used by the orchestrator
pub use cancel::*;
pub use deck::*;
pub use duel::{DuelFactory, DuelGame};
pub use types::*;

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

// =============================================================================
// Controller trait: implemented by every decision-making agent
// =============================================================================

/// What a controller gets to see when it has to make a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionView {
    /// Name of the deciding player
    pub player: String,
    /// Turn number, starting at 1
    pub turn: u32,
    /// Deciding player's life total
    pub life: i32,
    /// Every opponent still in the game
    pub opponents: Vec<OpponentView>,
    /// Cards the player may play this turn
    pub hand: Vec<Card>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpponentView {
    pub seat: Seat,
    pub name: String,
    pub life: i32,
}

/// Trait that all player controllers must implement.
///
/// The built-in strategy and remote decision services both sit behind this
/// trait, so the rules engine never knows which one it is talking to.
pub trait Controller: Send {
    /// Choose a card to play from `view.hand`.
    ///
    /// Returns the index of the chosen card, or `None` to pass the turn.
    fn choose(&mut self, view: &DecisionView) -> Result<Option<usize>, GameFault>;

    /// Returns the controller's name for logs and reports
    fn name(&self) -> &str;

    /// Reset internal state for a new game
    fn new_game(&mut self) {}
}

/// A controller shared between the orchestrator and the game worker thread.
pub type SharedController = Arc<Mutex<Box<dyn Controller>>>;

pub fn share_controller(controller: Box<dyn Controller>) -> SharedController {
    Arc::new(Mutex::new(controller))
}

/// A fully resolved seat: deck loaded, controller constructed.
#[derive(Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub deck: Arc<Deck>,
    pub controller: SharedController,
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("deck", &self.deck.name)
            .finish()
    }
}

// =============================================================================
// Game contract: the rules engine as seen by the match runner
// =============================================================================

/// One playthrough of a game.
///
/// `start` may block for a long time; it must poll `cancel` regularly and
/// return promptly once cancellation was requested, leaving the game "not over".
/// Seat controllers are reset (`Controller::new_game`) inside `start`, so a
/// controller held by a detached game can only stall the new game's worker.
pub trait Game: Send {
    /// Play the game until it is over or cancelled.
    fn start(&mut self, cancel: &CancelToken) -> Result<(), GameFault>;

    fn is_over(&self) -> bool;

    /// Terminal outcome, `None` while the game is still running.
    fn outcome(&self) -> Option<GameOutcome>;

    /// Force the game into a drawn terminal state. No-op once over.
    fn force_draw(&mut self);

    /// Ordered game log, oldest entry first.
    fn log(&self, verbosity: LogVerbosity) -> Vec<LogEntry>;
}

/// Creates fresh games. A new game is created for every attempt.
pub trait GameFactory: Send + Sync {
    fn create(
        &self,
        rules: &RuleSet,
        participants: &[Participant],
        game_index: u32,
    ) -> Result<Box<dyn Game>, GameFault>;
}
