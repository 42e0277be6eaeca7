use super::*;

#[test]
fn test_defaults() {
    let config = SimConfig::default();
    assert_eq!(config.game.timeout(), Duration::from_secs(1200));
    assert_eq!(config.faults.max_recoverable_per_pairing, 5);
    assert!(config.faults.escalate_outside_tournament);
    assert_eq!(config.decks.extension, "dck");
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sim.toml");
    std::fs::write(
        &path,
        "run_id = \"w3\"\n[game]\ntimeout_secs = 30\nseed = 11\n[remote]\nendpoint = \"10.0.0.2:9000\"\n",
    )
    .unwrap();

    let config = SimConfig::from_file(&path).unwrap();
    assert_eq!(config.run_id.as_deref(), Some("w3"));
    assert_eq!(config.game.timeout_secs, 30);
    assert_eq!(config.game.seed, 11);
    assert_eq!(config.game.max_turns, 200);
    assert_eq!(config.remote.endpoint, "10.0.0.2:9000");
    assert_eq!(config.remote.options().connect_timeout, Duration::from_secs(5));
}

#[test]
fn test_invalid_values_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[game]\ntimeout_secs = 0\n").unwrap();
    assert!(matches!(SimConfig::from_file(&path), Err(ConfigError::Invalid(_))));

    std::fs::write(&path, "[game\n").unwrap();
    assert!(matches!(SimConfig::from_file(&path), Err(ConfigError::Parse { .. })));
}

#[test]
fn test_oversized_stack_rejected() {
    let mut config = SimConfig::default();
    config.game.stack_size_mb = MAX_STACK_SIZE_MB;
    assert!(config.validate().is_ok());

    config.game.stack_size_mb = usize::MAX / 1024;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("stack_size_mb must be at most 4096"));
}

#[test]
fn test_explicit_missing_file_is_an_error() {
    let result = SimConfig::load(Some(Path::new("/definitely/not/here.toml")));
    assert!(matches!(result, Err(ConfigError::Read { .. })));
}

#[test]
fn test_deck_dir_per_format() {
    let decks = DeckSettings::default();
    assert_eq!(decks.dir_for(GameFormat::Commander), Path::new("decks/commander"));
    assert_eq!(decks.dir_for(GameFormat::Constructed), Path::new("decks/constructed"));
}
