use super::*;
use proptest::prelude::*;
use sim_core::{Card, DckFileLoader, MemoryDeckStore};
use std::fs;
use tempfile::TempDir;

const DECK_TEXT: &str = "[metadata]\nName=From Disk\n[main]\n4 Shock\n16 Mountain\n";

fn resolver_with(dir: &TempDir, store: MemoryDeckStore) -> DeckResolver {
    let settings = DeckSettings {
        constructed_dir: dir.path().join("constructed"),
        commander_dir: dir.path().join("commander"),
        ..Default::default()
    };
    fs::create_dir_all(&settings.constructed_dir).unwrap();
    fs::create_dir_all(&settings.commander_dir).unwrap();
    DeckResolver::new(settings, Box::new(DckFileLoader), Box::new(store))
}

fn write_deck(dir: &TempDir, format_dir: &str, file: &str, text: &str) {
    fs::create_dir_all(dir.path().join(format_dir)).unwrap();
    fs::write(dir.path().join(format_dir).join(file), text).unwrap();
}

#[test]
fn test_catalog_id_shape() {
    assert!(is_catalog_id("moxfield-TdOsPBP3302BdskyLVzU-A", 5));
    assert!(is_catalog_id("abc-de", 5));
    assert!(!is_catalog_id("ab-de", 5));
    assert!(!is_catalog_id("no_separator_here", 5));
    assert!(!is_catalog_id("has space-in-it", 5));
    assert!(!is_catalog_id("", 5));
}

#[test]
fn test_sanitize_examples() {
    assert_eq!(sanitize_filename("My Deck: v2!"), "My_Deck_v2");
    assert_eq!(sanitize_filename("__a__b__"), "a_b");
    assert_eq!(sanitize_filename("archidekt-12345-deck"), "archidekt-12345-deck");
    assert_eq!(sanitize_filename(""), PLACEHOLDER_DECK_NAME);
    assert_eq!(sanitize_filename("???"), PLACEHOLDER_DECK_NAME);
    assert_eq!(sanitize_filename("Jötun Grunt"), "J_tun_Grunt");
}

proptest! {
    #[test]
    fn prop_sanitize_is_idempotent(name in ".*") {
        let once = sanitize_filename(&name);
        prop_assert_eq!(sanitize_filename(&once), once.clone());
    }

    #[test]
    fn prop_sanitize_stays_in_alphabet(name in ".*") {
        let out = sanitize_filename(&name);
        prop_assert!(!out.is_empty());
        prop_assert!(out.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        prop_assert!(!out.starts_with('_') && !out.ends_with('_'));
        prop_assert!(!out.contains("__"));
    }
}

#[test]
fn test_catalog_id_exact_file() {
    let dir = tempfile::tempdir().unwrap();
    write_deck(&dir, "constructed", "moxfield-abc123.dck", DECK_TEXT);
    let resolver = resolver_with(&dir, MemoryDeckStore::new());

    let deck = resolver.resolve("moxfield-abc123", GameFormat::Constructed).unwrap();
    assert_eq!(deck.name, "From Disk");
}

#[test]
fn test_catalog_id_sanitized_file() {
    let dir = tempfile::tempdir().unwrap();
    write_deck(&dir, "commander", "archidekt_12-x.dck", DECK_TEXT);
    let resolver = resolver_with(&dir, MemoryDeckStore::new());

    let deck = resolver.resolve("archidekt__12-x_", GameFormat::Commander).unwrap();
    assert_eq!(deck.name, "From Disk");
}

#[test]
fn test_file_name_reference() {
    let dir = tempfile::tempdir().unwrap();
    write_deck(&dir, "constructed", "burn.dck", DECK_TEXT);
    let resolver = resolver_with(&dir, MemoryDeckStore::new());

    assert!(resolver.resolve("burn.dck", GameFormat::Constructed).is_ok());
    // The commander directory does not have it
    let err = resolver.resolve("burn.dck", GameFormat::Commander).unwrap_err();
    assert_eq!(err.reference, "burn.dck");
    assert!(err.searched.ends_with("commander"));
}

#[test]
fn test_store_key_reference() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = MemoryDeckStore::new();
    store.insert(
        GameFormat::Constructed,
        Deck::new("Stored Deck", vec![Card::new("Shock"); 10]),
    );
    let resolver = resolver_with(&dir, store);

    let deck = resolver.resolve("Stored Deck", GameFormat::Constructed).unwrap();
    assert_eq!(deck.len(), 10);
    assert!(resolver.resolve("Stored Deck", GameFormat::Commander).is_err());
}

#[test]
fn test_catalog_id_falls_back_to_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = MemoryDeckStore::new();
    store.insert(
        GameFormat::Constructed,
        Deck::new("mono-red-aggro", vec![Card::new("Shock"); 10]),
    );
    let resolver = resolver_with(&dir, store);

    assert!(resolver.resolve("mono-red-aggro", GameFormat::Constructed).is_ok());
}

#[test]
fn test_unknown_catalog_id_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = resolver_with(&dir, MemoryDeckStore::new());

    let err = resolver
        .resolve("moxfield-TdOsPBP3302BdskyLVzU-A", GameFormat::Constructed)
        .unwrap_err();
    assert_eq!(err.reference, "moxfield-TdOsPBP3302BdskyLVzU-A");
    assert!(err.cause.is_none());
}

#[test]
fn test_broken_file_is_reported_with_cause() {
    let dir = tempfile::tempdir().unwrap();
    write_deck(&dir, "constructed", "empty.dck", "[metadata]\nName=Empty\n");
    let resolver = resolver_with(&dir, MemoryDeckStore::new());

    let err = resolver.resolve("empty.dck", GameFormat::Constructed).unwrap_err();
    assert!(err.cause.is_some());
}

#[test]
fn test_load_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_deck(&dir, "constructed", "b.dck", DECK_TEXT);
    write_deck(&dir, "constructed", "a.dck", "[main]\n3 Shock\n");
    write_deck(&dir, "constructed", "readme.txt", "not a deck");
    let resolver = resolver_with(&dir, MemoryDeckStore::new());

    let decks = resolver.load_directory(&dir.path().join("constructed")).unwrap();
    let names: Vec<_> = decks.iter().map(|(r, d)| (r.as_str(), d.name.as_str())).collect();
    assert_eq!(names, vec![("a.dck", "a"), ("b.dck", "From Disk")]);

    assert!(resolver.load_directory(&dir.path().join("missing")).unwrap().is_empty());
}
