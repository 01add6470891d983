use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use super::*;
use crate::fakes::{FakeCatalog, FakeGuesser, Reply, game, not_game};

fn systems() -> SystemMapping {
    let mut systems = SystemMapping::new();
    systems.insert("megadrive", "1");
    systems.insert("mastersystem", "2");
    systems
}

fn rom(path: &str, sha1: Option<&str>) -> RomIdentity {
    RomIdentity {
        sha1: sha1.map(str::to_string),
        ..RomIdentity::from_library_path(path)
    }
}

fn resolver<'a>(
    catalog: &'a FakeCatalog,
    guesser: Option<&'a FakeGuesser>,
    systems: &'a SystemMapping,
    alt_names: &'a Mutex<AltNameStore>,
) -> Resolver<'a, FakeCatalog, FakeGuesser> {
    Resolver {
        catalog,
        guesser,
        systems,
        alt_names,
    }
}

fn matched(resolution: Resolution) -> LookupResult {
    match resolution {
        Resolution::Matched(result) => result,
        other => panic!("expected a match, got {:?}", other),
    }
}

#[tokio::test]
async fn test_hash_match_stops_the_chain() {
    let catalog = FakeCatalog::new()
        .with(CatalogQuery::hash("abc"), Reply::Found(game("Sonic")))
        .with(CatalogQuery::name("Sonic", "1"), Reply::Found(game("Wrong")));
    let systems = systems();
    let alt = Mutex::new(AltNameStore::default());

    let result = matched(
        resolver(&catalog, None, &systems, &alt)
            .resolve(&rom("./Sonic.zip", Some("abc")), "megadrive", &ProgressSink::silent())
            .await
            .unwrap(),
    );
    assert_eq!(result.method, LookupMethod::Hash);
    assert_eq!(result.game.display_name(), Some("Sonic"));
    assert_eq!(catalog.queries().len(), 1);
}

#[tokio::test]
async fn test_not_game_hash_falls_through_to_name() {
    let catalog = FakeCatalog::new()
        .with(CatalogQuery::hash("abc"), Reply::Found(not_game()))
        .with(CatalogQuery::name("Sonic", "1"), Reply::Found(game("Sonic")));
    let systems = systems();
    let alt = Mutex::new(AltNameStore::default());
    let (sink, mut rx) = ProgressSink::channel();

    let result = matched(
        resolver(&catalog, None, &systems, &alt)
            .resolve(&rom("./Sonic.zip", Some("abc")), "megadrive", &sink)
            .await
            .unwrap(),
    );
    assert_eq!(result.method, LookupMethod::Name);
    assert_eq!(rx.recv().await, Some(ScrapeEvent::HashNotGame));
}

#[tokio::test]
async fn test_excluded_extension_skips_hash() {
    let catalog = FakeCatalog::new();
    let systems = systems();
    let alt = Mutex::new(AltNameStore::default());

    let resolution = resolver(&catalog, None, &systems, &alt)
        .resolve(&rom("./dl.daphne", Some("abc")), "megadrive", &ProgressSink::silent())
        .await
        .unwrap();
    assert!(matches!(resolution, Resolution::NoMatch));
    assert_eq!(catalog.queries(), vec![CatalogQuery::name("dl", "1")]);
}

#[tokio::test]
async fn test_unmapped_system_skips_name_search() {
    let catalog = FakeCatalog::new();
    let systems = systems();
    let alt = Mutex::new(AltNameStore::default());
    let guesser = FakeGuesser::new(&["Pong"]);
    let (sink, mut rx) = ProgressSink::channel();

    let resolution = resolver(&catalog, Some(&guesser), &systems, &alt)
        .resolve(&rom("./pong.zip", None), "odyssey", &sink)
        .await
        .unwrap();
    assert!(matches!(resolution, Resolution::NoMatch));
    assert!(catalog.queries().is_empty());
    // Guessing needs a system id too
    assert_eq!(guesser.call_count(), 0);
    assert_eq!(
        rx.recv().await,
        Some(ScrapeEvent::NameSearchUnavailable {
            system: "odyssey".to_string()
        })
    );
    assert_eq!(
        rx.recv().await,
        Some(ScrapeEvent::GuessUnavailable {
            system: "odyssey".to_string()
        })
    );
}

#[tokio::test]
async fn test_alt_names_use_target_system_and_source_filter() {
    let catalog = FakeCatalog::new().with(
        CatalogQuery::name("Sonic the Hedgehog", "2"),
        Reply::Found(game("Sonic the Hedgehog")),
    );
    let systems = systems();
    let alt = Mutex::new(AltNameStore::in_memory(vec![
        AltNameMapping::new("sonic", "Sonic (Arcade)", Some("arcade"), None),
        AltNameMapping::new("sonic", "Sonic 1", None, None),
        AltNameMapping::new(
            "sonic",
            "Sonic the Hedgehog",
            Some("megadrive"),
            Some("mastersystem"),
        ),
    ]));

    let result = matched(
        resolver(&catalog, None, &systems, &alt)
            .resolve(&rom("./sonic.zip", None), "megadrive", &ProgressSink::silent())
            .await
            .unwrap(),
    );
    assert_eq!(
        result.method,
        LookupMethod::AltName {
            name: "Sonic the Hedgehog".to_string(),
            system: "mastersystem".to_string(),
        }
    );
    assert_eq!(
        catalog.queries(),
        vec![
            CatalogQuery::name("sonic", "1"),
            CatalogQuery::name("Sonic 1", "1"),
            CatalogQuery::name("Sonic the Hedgehog", "2"),
        ]
    );
}

#[tokio::test]
async fn test_ai_guess_match_is_recorded() {
    let catalog = FakeCatalog::new().with(
        CatalogQuery::name("Streets of Rage 2", "1"),
        Reply::Found(game("Streets of Rage 2")),
    );
    let systems = systems();
    let alt = Mutex::new(AltNameStore::default());
    let guesser = FakeGuesser::new(&["Bare Knuckle II", "Streets of Rage 2", "Never Tried"]);

    let result = matched(
        resolver(&catalog, Some(&guesser), &systems, &alt)
            .resolve(&rom("./sor2.zip", None), "megadrive", &ProgressSink::silent())
            .await
            .unwrap(),
    );
    assert_eq!(
        result.method,
        LookupMethod::AiGuess {
            title: "Streets of Rage 2".to_string()
        }
    );
    let added = result.added_alt_name.unwrap();
    assert_eq!(added.source_stem, "sor2");
    assert_eq!(added.source_system.as_deref(), Some("megadrive"));
    assert_eq!(alt.lock().await.candidates("sor2", "megadrive").len(), 1);
    // Name, then two guesses; the third is never sent
    assert_eq!(catalog.queries().len(), 3);
}

#[tokio::test]
async fn test_stage_failure_moves_on() {
    let catalog = FakeCatalog::new()
        .with(CatalogQuery::hash("abc"), Reply::Timeout)
        .with(CatalogQuery::name("Sonic", "1"), Reply::Found(game("Sonic")));
    let systems = systems();
    let alt = Mutex::new(AltNameStore::default());
    let (sink, mut rx) = ProgressSink::channel();

    let result = matched(
        resolver(&catalog, None, &systems, &alt)
            .resolve(&rom("./Sonic.zip", Some("abc")), "megadrive", &sink)
            .await
            .unwrap(),
    );
    assert_eq!(result.method, LookupMethod::Name);
    assert!(matches!(
        rx.recv().await,
        Some(ScrapeEvent::StageFailed { stage: "SHA1", .. })
    ));
}

#[tokio::test]
async fn test_closed_server_aborts() {
    let catalog = FakeCatalog::new().with(CatalogQuery::hash("abc"), Reply::Closed);
    let systems = systems();
    let alt = Mutex::new(AltNameStore::default());

    let err = resolver(&catalog, None, &systems, &alt)
        .resolve(&rom("./Sonic.zip", Some("abc")), "megadrive", &ProgressSink::silent())
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::ServerClosed(_)));
    assert_eq!(catalog.queries().len(), 1);
}

#[tokio::test]
async fn test_cancel_between_stages() {
    let catalog = FakeCatalog::new();
    let systems = systems();
    let alt = Mutex::new(AltNameStore::default());
    let sink = ProgressSink::new(None, None, Arc::new(AtomicBool::new(true)));

    let resolution = resolver(&catalog, None, &systems, &alt)
        .resolve(&rom("./Sonic.zip", Some("abc")), "megadrive", &sink)
        .await
        .unwrap();
    assert!(matches!(resolution, Resolution::Cancelled));
    // The in-flight hash stage finishes; nothing after it starts
    assert_eq!(catalog.queries(), vec![CatalogQuery::hash("abc")]);
}
