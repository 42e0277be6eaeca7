use super::*;
use crate::controllers::ControllerKind;
use crate::lineup::ParticipantSpec;
use crate::match_runner::{MatchRunner, MemorySink};
use crate::pairing::{TournamentFormat, TournamentPlayer};
use crate::results::ResultsConfig;
use crate::test_support::{fast_config, participants, Script, ScriptedFactory};
use sim_core::{GameFormat, ParticipantId};

fn orchestrator(factory: ScriptedFactory, faults: FaultPolicy) -> (Orchestrator, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let runner = MatchRunner::new(Arc::new(factory), fast_config(), sink.clone());
    (
        Orchestrator::new(MatchScheduler::new(runner), faults, sink.clone()),
        sink,
    )
}

fn entrants(participants: &[Participant]) -> Vec<TournamentPlayer> {
    participants
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mut spec = ParticipantSpec::new(format!("{}.dck", p.name), ControllerKind::Default);
            spec.display_name = Some(p.name.clone());
            TournamentPlayer::new(p.id, i as u32, spec)
        })
        .collect()
}

fn empty_results() -> TournamentResults {
    TournamentResults::new(
        "test",
        Some(TournamentFormat::Bracket),
        Vec::new(),
        ResultsConfig {
            format: "Constructed".into(),
            games_per_match: 3,
            players_per_match: 2,
        },
    )
}

fn best_of(n: u32) -> MatchConfig {
    MatchConfig::new(RuleSet::new(GameFormat::Constructed), n, 1, participants(2))
}

#[test]
fn test_recoverable_error_escalates_outside_tournament() {
    let (orchestrator, _) = orchestrator(
        ScriptedFactory::repeat(Script::Recoverable),
        FaultPolicy::default(),
    );
    let fault = orchestrator.play_match(&best_of(3)).unwrap_err();
    assert_eq!(fault.game, 1);
    assert!(fault.reason.contains("outside a tournament"));
}

#[test]
fn test_retries_when_escalation_is_off() {
    let faults = FaultPolicy {
        escalate_outside_tournament: false,
        ..Default::default()
    };
    let (orchestrator, sink) = orchestrator(
        ScriptedFactory::new(vec![Script::Recoverable], Script::Win(0)),
        faults,
    );
    let outcome = orchestrator.play_match(&best_of(3)).unwrap();
    assert_eq!(outcome.faults, 1);
    assert!(!outcome.abandoned);
    assert_eq!(outcome.result.games.len(), 2);

    let lines = sink.lines();
    assert_eq!(lines[0], "P1 vs P2 - best of 3 of Constructed");
    assert!(lines.iter().any(|l| l == "Game threw exception. Abandoning game and continuing..."));
}

#[test]
fn test_six_errors_abandon_the_pairing() {
    let (orchestrator, sink) = orchestrator(
        ScriptedFactory::new(vec![Script::Win(1)], Script::Recoverable),
        FaultPolicy::default(),
    );
    let outcome = orchestrator.play_with_retries(&best_of(3)).unwrap();
    assert!(outcome.abandoned);
    assert_eq!(outcome.faults, 6);
    // The one decisive game still decides the abandoned match
    assert_eq!(outcome.result.winner, Some(ParticipantId(1)));

    let lines = sink.lines();
    let continuing = lines
        .iter()
        .filter(|l| l.as_str() == "Game threw exception. Abandoning game and continuing...")
        .count();
    assert_eq!(continuing, 5);
    assert_eq!(
        lines.last().map(String::as_str),
        Some("Exceeded number of exceptions thrown. Abandoning match...")
    );
}

#[test]
fn test_fatal_fault_stops_retries() {
    let (orchestrator, _) = orchestrator(
        ScriptedFactory::new(vec![Script::Recoverable, Script::Panic], Script::Win(0)),
        FaultPolicy::default(),
    );
    assert!(orchestrator.play_with_retries(&best_of(3)).is_err());
}

#[test]
fn test_tournament_continues_after_abandoned_pairing() {
    // First pairing throws six times, everything else is won by seat 0
    let mut scripts = vec![Script::Recoverable; 6];
    scripts.extend([Script::Win(0), Script::Win(0)]);
    let (orchestrator, sink) = orchestrator(
        ScriptedFactory::new(scripts, Script::Win(0)),
        FaultPolicy::default(),
    );
    let players = participants(4);
    let mut tournament = Tournament::new(TournamentFormat::Bracket);
    tournament.initialize(entrants(&players), 2).unwrap();
    let mut results = empty_results();

    orchestrator
        .run_tournament(
            &mut tournament,
            &players,
            &RuleSet::new(GameFormat::Constructed),
            &mut results,
        )
        .unwrap();

    assert!(tournament.is_complete());
    // P1/P2 abandoned with no winner, P3 beats P4 and then has nobody left to play
    assert!(results.matches[0].abandoned);
    assert_eq!(results.matches[0].winner, None);
    assert_eq!(results.matches[1].winner.as_deref(), Some("P3"));
    assert_eq!(results.champion.as_deref(), Some("P3"));

    let lines = sink.lines();
    assert_eq!(lines[0], "Starting a bracket tournament with 4 players over 2 rounds");
    assert!(lines.iter().any(|l| l == "Round 1 Pairings:"));
    assert!(lines.iter().any(|l| l == "Round 1 - P3 vs P4"));
    assert!(lines.iter().any(|l| l == "Match Winner - P3!"));
}

#[test]
fn test_round_robin_tournament_with_byes() {
    let (orchestrator, sink) = orchestrator(ScriptedFactory::repeat(Script::Win(0)), FaultPolicy::default());
    let players = participants(3);
    let mut tournament = Tournament::new(TournamentFormat::RoundRobin);
    tournament.initialize(entrants(&players), 2).unwrap();
    let mut results = empty_results();

    orchestrator
        .run_tournament(
            &mut tournament,
            &players,
            &RuleSet::new(GameFormat::Constructed),
            &mut results,
        )
        .unwrap();

    assert_eq!(results.matches.iter().filter(|m| m.bye).count(), 3);
    assert_eq!(results.standings.len(), 3);
    let lines = sink.lines();
    assert!(lines.iter().any(|l| l == "End Round - 1"));
    assert!(lines.iter().any(|l| l == "End Round - 2"));
}
