use super::*;
use remote_controller::RemoteError;
use std::net::TcpListener;
use std::time::Duration;

fn tokens(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_token_parsing() {
    assert_eq!(ControllerKind::from_token("AI"), ControllerKind::Default);
    assert_eq!(ControllerKind::from_token("default"), ControllerKind::Default);
    assert_eq!(ControllerKind::from_token("llm"), ControllerKind::Alternate);
    assert_eq!(ControllerKind::from_token(" Remote "), ControllerKind::Alternate);
    assert_eq!(ControllerKind::from_token("wizard"), ControllerKind::Default);
}

#[test]
fn test_broadcast_applies_to_every_seat() {
    let spec = ControllerSpec::parse(&tokens(&["llm"]));
    assert_eq!(spec, ControllerSpec::Broadcast(ControllerKind::Alternate));
    for index in 0..4 {
        assert_eq!(assign(index, &spec), ControllerKind::Alternate);
    }
}

#[test]
fn test_positional_and_comma_list_agree() {
    let listed = ControllerSpec::parse(&tokens(&["llm", "ai", "llm"]));
    let comma = ControllerSpec::parse(&tokens(&["llm,ai,llm"]));
    assert_eq!(listed, comma);
    assert_eq!(assign(0, &comma), ControllerKind::Alternate);
    assert_eq!(assign(1, &comma), ControllerKind::Default);
    assert_eq!(assign(2, &comma), ControllerKind::Alternate);
}

#[test]
fn test_seats_past_the_list_use_first_token() {
    let spec = ControllerSpec::parse(&tokens(&["llm,ai"]));
    assert_eq!(assign(5, &spec), ControllerKind::Alternate);
}

#[test]
fn test_empty_spec_is_default() {
    let spec = ControllerSpec::parse(&[]);
    assert_eq!(assign(0, &spec), ControllerKind::Default);
    assert_eq!(assign(3, &ControllerSpec::default()), ControllerKind::Default);
}

#[test]
fn test_player_names() {
    assert_eq!(
        player_name(Some((0, ControllerKind::Default)), "Burn", None),
        "Ai(1)-Burn"
    );
    assert_eq!(
        player_name(Some((1, ControllerKind::Alternate)), "Elves", Some("run7")),
        "LLM(2)-Elves-run7"
    );
    assert_eq!(player_name(None, "Elves", Some("")), "Elves");
}

#[test]
fn test_registry_builds_default_controller() {
    let registry = ControllerRegistry::new(
        Box::new(StandardControllers::new(3, RemoteOptions::default())),
        "localhost:7861",
    );
    let controller = registry
        .build(ControllerKind::Default, "Ai(1)-Burn", 0)
        .unwrap();
    assert_eq!(controller.name(), "Ai(1)-Burn");
}

#[test]
fn test_remote_failure_is_not_downgraded() {
    // Grab a free port, then close it so the connect is refused
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let options = RemoteOptions {
        connect_timeout: Duration::from_millis(500),
        decision_timeout: Duration::from_millis(500),
    };
    let registry = ControllerRegistry::new(
        Box::new(StandardControllers::new(0, options)),
        format!("127.0.0.1:{port}"),
    );

    let err = registry
        .build(ControllerKind::Alternate, "LLM(1)-Burn", 0)
        .err()
        .unwrap();
    match err {
        ControllerError::Remote { player, source } => {
            assert_eq!(player, "LLM(1)-Burn");
            assert!(matches!(source, RemoteError::Connect { .. }));
        }
    }
}
