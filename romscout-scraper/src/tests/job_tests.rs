use super::*;
use crate::alt_names::AltNameStore;
use crate::catalog::CatalogQuery;
use crate::fakes::{FakeCatalog, FakeGuesser, Reply, game};
use crate::log::{COMPLETE_LINE, INTERRUPTED_LINE, STARTED_LINE};
use crate::settings::Settings;
use crate::systems::SystemMapping;

struct Setup {
    _dir: tempfile::TempDir,
    settings: Settings,
}

impl Setup {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.paths.roms_root = dir.path().join("roms");
        settings.paths.progress_log = dir.path().join("scrape.log");
        Self {
            _dir: dir,
            settings,
        }
    }

    fn rom(&self, system: &str, name: &str) -> JobItem {
        let dir = self.settings.system_dir(system);
        std::fs::create_dir_all(&dir).unwrap();
        let rom = dir.join(name);
        std::fs::write(&rom, name.as_bytes()).unwrap();
        JobItem {
            system: system.to_string(),
            rom,
        }
    }

    fn scraper(&self, catalog: FakeCatalog) -> Arc<Scraper<FakeCatalog, FakeGuesser>> {
        let mut systems = SystemMapping::new();
        systems.insert("megadrive", "1");
        systems.insert("snes", "4");
        Arc::new(Scraper::new(
            catalog,
            None,
            self.settings.clone(),
            systems,
            AltNameStore::default(),
        ))
    }

    fn controller(&self) -> JobController {
        JobController::new(Some(self.settings.paths.progress_log.clone()))
    }
}

fn collect(rx: &mut mpsc::UnboundedReceiver<ScrapeEvent>) -> Vec<ScrapeEvent> {
    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    events
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let setup = Setup::new();
    let items = vec![setup.rom("megadrive", "a.bin")];
    let controller = setup.controller();
    let scraper = setup.scraper(FakeCatalog::new());

    let handle = controller
        .start(Arc::clone(&scraper), items.clone(), MergeMode::default())
        .unwrap();
    assert!(controller.is_running());
    assert!(matches!(
        controller.start(Arc::clone(&scraper), items.clone(), MergeMode::default()),
        Err(ScrapeError::JobAlreadyRunning)
    ));

    handle.wait().await.unwrap();
    assert!(!controller.is_running());
    let again = controller
        .start(scraper, items, MergeMode::default())
        .unwrap();
    again.wait().await.unwrap();
}

#[tokio::test]
async fn test_cancel_stops_before_next_item() {
    let setup = Setup::new();
    let items = vec![
        setup.rom("megadrive", "a.bin"),
        setup.rom("megadrive", "b.bin"),
        setup.rom("megadrive", "c.bin"),
    ];
    let controller = setup.controller();
    let scraper = setup.scraper(FakeCatalog::new().cancelling(controller.cancel_flag()));

    let JobHandle { mut events, task } = controller
        .start(Arc::clone(&scraper), items, MergeMode::default())
        .unwrap();
    let summary = task.await.unwrap();

    // Only the hash stage of the first ROM ran
    assert_eq!(scraper.catalog().queries().len(), 1);
    assert_eq!(summary.processed(), 0);
    let events = collect(&mut events);
    assert_eq!(events.last(), Some(&ScrapeEvent::Interrupted));
    assert!(!events.contains(&ScrapeEvent::Progress { index: 2, total: 3 }));
    assert!(!controller.is_running());

    let lines = controller.progress_lines().unwrap();
    assert_eq!(lines.last().map(String::as_str), Some(INTERRUPTED_LINE));
}

#[tokio::test]
async fn test_failures_do_not_abort_the_batch() {
    let setup = Setup::new();
    let broken = setup.rom("snes", "broken.sfc");
    std::fs::write(setup.settings.gamelist_path("snes"), "{not xml").unwrap();
    let items = vec![
        broken,
        setup.rom("megadrive", "Panic.bin"),
        setup.rom("megadrive", "Sonic.bin"),
    ];
    let catalog = FakeCatalog::new()
        .with(CatalogQuery::name("Panic", "1"), Reply::Panic)
        .with(CatalogQuery::name("Sonic", "1"), Reply::Found(game("Sonic")));
    let controller = setup.controller();

    let handle = controller
        .start(setup.scraper(catalog), items, MergeMode::default())
        .unwrap();
    let summary = handle.wait().await.unwrap();

    assert_eq!(summary.failed, 2);
    assert_eq!(summary.scraped, 1);
    assert_eq!(summary.by_name, 1);
    assert!(!controller.is_running());

    let lines = controller.progress_lines().unwrap();
    assert_eq!(lines[0], STARTED_LINE);
    assert!(lines.iter().any(|l| l == "--- Progress: [3/3] ---"));
    assert!(lines.iter().any(|l| l.contains("panicked: catalog exploded")));
    assert!(lines.iter().any(|l| l.starts_with("Summary: 1 scraped")));
    assert_eq!(lines.last().map(String::as_str), Some(COMPLETE_LINE));
}

#[tokio::test]
async fn test_empty_job_completes() {
    let setup = Setup::new();
    let controller = JobController::new(None);
    let JobHandle { mut events, task } = controller
        .start(setup.scraper(FakeCatalog::new()), Vec::new(), MergeMode::default())
        .unwrap();
    let summary = task.await.unwrap();
    assert_eq!(summary, JobSummary::default());
    assert_eq!(
        collect(&mut events),
        vec![
            ScrapeEvent::JobStarted { total: 0 },
            ScrapeEvent::Summary(JobSummary::default()),
            ScrapeEvent::Complete,
        ]
    );
    assert!(controller.progress_lines().unwrap().is_empty());
}
