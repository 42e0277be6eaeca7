use super::*;
use crate::{share_controller, Controller, Deck, ParticipantId};
use std::sync::Arc;

/// Always plays the first card in hand.
struct FirstCard(String);

impl Controller for FirstCard {
    fn choose(&mut self, view: &DecisionView) -> Result<Option<usize>, GameFault> {
        Ok(if view.hand.is_empty() { None } else { Some(0) })
    }

    fn name(&self) -> &str {
        &self.0
    }
}

/// Fails on its first decision.
struct Faulty;

impl Controller for Faulty {
    fn choose(&mut self, _view: &DecisionView) -> Result<Option<usize>, GameFault> {
        Err(GameFault::Recoverable("decision service hung up".to_string()))
    }

    fn name(&self) -> &str {
        "faulty"
    }
}

fn deck(name: &str) -> Arc<Deck> {
    let cards = (0..30).map(|i| Card::new(format!("Card {}", i % 6))).collect();
    Arc::new(Deck::new(name, cards))
}

fn player(id: u32, controller: Box<dyn Controller>) -> Participant {
    Participant {
        id: ParticipantId(id),
        name: format!("P{}", id),
        deck: deck("Test Deck"),
        controller: share_controller(controller),
    }
}

fn two_players() -> Vec<Participant> {
    vec![
        player(1, Box::new(FirstCard("a".into()))),
        player(2, Box::new(FirstCard("b".into()))),
    ]
}

#[test]
fn test_duel_plays_to_a_winner() {
    let rules = RuleSet::new(GameFormat::Constructed);
    let mut game = DuelFactory::new(7).create(&rules, &two_players(), 0).unwrap();

    game.start(&CancelToken::new()).unwrap();

    assert!(game.is_over());
    assert!(matches!(game.outcome(), Some(GameOutcome::Winner(_))));
    let results = game.log(LogVerbosity::ResultsOnly);
    assert_eq!(results.len(), 1);
    assert!(results[0].message.ends_with("has won!"));
    assert!(game.log(LogVerbosity::Full).len() > results.len());
}

#[test]
fn test_same_seed_replays_identically() {
    let rules = RuleSet::new(GameFormat::Constructed);
    let run = || {
        let mut game = DuelFactory::new(42).create(&rules, &two_players(), 3).unwrap();
        game.start(&CancelToken::new()).unwrap();
        (game.outcome(), game.log(LogVerbosity::Full))
    };
    assert_eq!(run(), run());
}

#[test]
fn test_cancelled_game_stays_open_until_forced() {
    let rules = RuleSet::new(GameFormat::Constructed);
    let mut game = DuelFactory::new(1).create(&rules, &two_players(), 0).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    game.start(&cancel).unwrap();
    assert!(!game.is_over());

    game.force_draw();
    game.force_draw();
    assert_eq!(game.outcome(), Some(GameOutcome::Draw));
    assert_eq!(game.log(LogVerbosity::ResultsOnly).len(), 1);
}

#[test]
fn test_turn_cap_is_a_draw() {
    let mut rules = RuleSet::new(GameFormat::Constructed);
    rules.max_turns = 2;
    let mut game = DuelFactory::new(1).create(&rules, &two_players(), 0).unwrap();

    game.start(&CancelToken::new()).unwrap();
    assert_eq!(game.outcome(), Some(GameOutcome::Draw));
}

#[test]
fn test_controller_fault_propagates() {
    let rules = RuleSet::new(GameFormat::Constructed);
    let players = vec![player(1, Box::new(Faulty)), player(2, Box::new(Faulty))];
    let mut game = DuelFactory::new(1).create(&rules, &players, 0).unwrap();

    let err = game.start(&CancelToken::new()).unwrap_err();
    assert!(matches!(err, GameFault::Recoverable(_)));
    assert!(!game.is_over());
}

#[test]
fn test_single_player_is_rejected() {
    let rules = RuleSet::new(GameFormat::Constructed);
    let players = vec![player(1, Box::new(FirstCard("solo".into())))];
    let result = DuelFactory::new(1).create(&rules, &players, 0);
    assert!(matches!(result, Err(GameFault::Recoverable(_))));
}

#[test]
fn test_three_player_game_finishes() {
    let rules = RuleSet::new(GameFormat::Commander);
    let mut players = two_players();
    players.push(player(3, Box::new(FirstCard("c".into()))));
    let mut game = DuelFactory::new(9).create(&rules, &players, 1).unwrap();

    game.start(&CancelToken::new()).unwrap();
    assert!(game.is_over());
}
