//! Simulation CLI
//!
//! Play a single match or a whole tournament between decks, headless.

use anyhow::{bail, Context, Result};
use clap::Parser;
use sim_core::{DckFileLoader, DuelFactory, GameFormat, MemoryDeckStore, RuleSet};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tournament::{
    match_score, specs_for, ControllerRegistry, ControllerSpec, DeckResolver, FatalFault,
    LineupBuilder, MatchConfig, MatchRunner, MatchScheduler, Orchestrator, ResultsConfig,
    RunError, RunnerConfig, SimConfig, StandardControllers, StdoutSink, Tournament,
    TournamentFormat, TournamentPlayer, TournamentResults,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sim", about = "Headless card game simulation", long_about = None)]
struct Cli {
    /// Deck references: catalog ids, `.dck` file names or deck names
    #[arg(short = 'd', long = "decks", num_args = 1..)]
    decks: Vec<String>,

    /// Enter every deck file in this directory (tournaments only)
    #[arg(short = 'D', long = "deck-dir")]
    deck_dir: Option<PathBuf>,

    /// Games to play when no best-of size is given
    #[arg(short = 'n', long = "games", default_value_t = 1)]
    games: u32,

    /// Best-of size; 0 plays exactly `-n` games
    #[arg(short = 'm', long = "match-size", default_value_t = 0)]
    match_size: u32,

    /// Tournament shape: bracket, roundrobin or swiss
    #[arg(short = 't', long = "tournament")]
    tournament: Option<TournamentFormat>,

    /// Players per tournament pairing
    #[arg(short = 'p', long = "players", default_value_t = 2)]
    players_per_match: usize,

    /// Game format
    #[arg(short = 'f', long = "format", default_value = "constructed")]
    format: GameFormat,

    /// Controller kinds, by seat (`ai`, `llm`, or a comma list)
    #[arg(short = 'c', long = "controllers", num_args = 1..)]
    controllers: Vec<String>,

    /// Only print game results
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Debug diagnostics on stderr
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Settings file (defaults to sim.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// Per-game time limit
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Write results as JSON to this path
    #[arg(long)]
    results: Option<PathBuf>,

    /// Suffix for player names
    #[arg(long)]
    run_id: Option<String>,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Everything shared by the match and tournament paths.
struct Session {
    config: SimConfig,
    rules: RuleSet,
    resolver: DeckResolver,
    registry: ControllerRegistry,
    orchestrator: Orchestrator,
}

impl Session {
    fn build(cli: &Cli) -> Result<Self> {
        let mut config = SimConfig::load(cli.config.as_deref())?;
        if let Some(seed) = cli.seed {
            config.game.seed = seed;
        }
        if let Some(secs) = cli.timeout_secs {
            config.game.timeout_secs = secs;
        }
        if cli.run_id.is_some() {
            config.run_id = cli.run_id.clone();
        }
        config.validate()?;

        let mut rules = RuleSet::new(cli.format);
        rules.max_turns = config.game.max_turns;
        if cli.match_size > 0 {
            rules.games_per_match = cli.match_size;
        }

        let mut store = MemoryDeckStore::new();
        let indexed = store.scan_dir(
            cli.format,
            config.decks.dir_for(cli.format),
            &config.decks.extension,
            &DckFileLoader,
        );
        info!(format = %cli.format, decks = indexed, "indexed deck store");
        let resolver = DeckResolver::new(
            config.decks.clone(),
            Box::new(DckFileLoader),
            Box::new(store),
        );

        let registry = ControllerRegistry::new(
            Box::new(StandardControllers::new(
                config.game.seed,
                config.remote.options(),
            )),
            config.remote.endpoint.clone(),
        );

        let sink = Arc::new(StdoutSink);
        let runner = MatchRunner::new(
            Arc::new(DuelFactory::new(config.game.seed)),
            RunnerConfig::from_settings(&config.game, cli.quiet),
            sink.clone(),
        );
        let orchestrator = Orchestrator::new(MatchScheduler::new(runner), config.faults.clone(), sink);

        Ok(Self {
            config,
            rules,
            resolver,
            registry,
            orchestrator,
        })
    }

    fn lineup(&self) -> LineupBuilder<'_> {
        LineupBuilder::new(
            &self.resolver,
            &self.registry,
            self.rules.format,
            self.config.run_id.as_deref(),
        )
    }
}

fn run(cli: &Cli) -> Result<()> {
    let controllers = ControllerSpec::parse(&cli.controllers);
    let session = Session::build(cli)?;

    match cli.tournament {
        Some(format) => run_tournament(cli, &session, format, &controllers),
        None => {
            if cli.deck_dir.is_some() {
                bail!("-D only applies to tournaments; add -t <bracket|roundrobin|swiss>");
            }
            run_match(cli, &session, &controllers)
        }
    }
}

fn run_match(cli: &Cli, session: &Session, controllers: &ControllerSpec) -> Result<()> {
    let specs = specs_for(&cli.decks, controllers);
    let seats = session.lineup().match_seats(&specs)?;
    let config = MatchConfig::new(session.rules.clone(), cli.match_size, cli.games, seats);

    let outcome = session.orchestrator.play_match(&config)?;

    println!();
    println!("=== Final Result ===");
    println!("{}", match_score(&config, &outcome.result));
    match outcome.result.winner {
        Some(id) => {
            if let Some(winner) = config.participants.iter().find(|p| p.id == id) {
                println!("Winner: {}", winner.name);
            }
        }
        None => println!("No match winner"),
    }

    if let Some(path) = &cli.results {
        TournamentResults::for_match(&config, &outcome)
            .save(path)
            .with_context(|| format!("saving results to {}", path.display()))?;
    }
    Ok(())
}

fn run_tournament(
    cli: &Cli,
    session: &Session,
    format: TournamentFormat,
    controllers: &ControllerSpec,
) -> Result<()> {
    let lineup = session.lineup();
    if cli.decks.is_empty() && cli.deck_dir.is_none() {
        bail!("a tournament needs decks: pass -d <decks...> and/or -D <dir>");
    }
    let (specs, participants) =
        lineup.combined_entrants(&cli.decks, cli.deck_dir.as_deref(), controllers)?;

    let players: Vec<TournamentPlayer> = participants
        .iter()
        .zip(specs)
        .enumerate()
        .map(|(seed, (participant, spec))| TournamentPlayer::new(participant.id, seed as u32, spec))
        .collect();

    let mut tournament = Tournament::new(format);
    tournament.initialize(players, cli.players_per_match)?;

    let mut results = TournamentResults::new(
        &format!("{} tournament", format),
        Some(format),
        participants.iter().map(|p| p.name.clone()).collect(),
        ResultsConfig {
            format: session.rules.format.to_string(),
            games_per_match: session.rules.games_per_match,
            players_per_match: cli.players_per_match,
        },
    );

    session
        .orchestrator
        .run_tournament(&mut tournament, &participants, &session.rules, &mut results)?;

    if let Some(path) = &cli.results {
        results
            .save(path)
            .with_context(|| format!("saving results to {}", path.display()))?;
    }
    Ok(())
}

/// 1 for a crashed game, 2 for anything that stopped us before or around play.
fn exit_code(err: &anyhow::Error) -> u8 {
    let crashed = err.downcast_ref::<FatalFault>().is_some()
        || matches!(err.downcast_ref::<RunError>(), Some(RunError::Fatal(_)));
    if crashed {
        1
    } else {
        2
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = exit_code(&err);
            if code == 1 {
                error!("Terminating simulation due to a critical error: {err:#}");
            } else {
                error!("{err:#}");
                eprintln!("Run `sim --help` for usage.");
            }
            ExitCode::from(code)
        }
    }
}
