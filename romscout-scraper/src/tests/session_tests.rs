use super::*;
use crate::alt_names::AltNameStore;
use crate::fakes::{FakeCatalog, FakeGuesser, Reply, game, media};
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
        settings.paths.scratch_dir = dir.path().join("sessions");
        settings.paths.alt_names_file = dir.path().join("alt_rom_names.csv");
        std::fs::create_dir_all(settings.paths.roms_root.join("megadrive")).unwrap();
        Self {
            _dir: dir,
            settings,
        }
    }

    fn scraper(&self, catalog: FakeCatalog) -> Scraper<FakeCatalog, FakeGuesser> {
        let mut systems = SystemMapping::new();
        systems.insert("megadrive", "1");
        systems.insert("mastersystem", "2");
        let alt = AltNameStore::load(&self.settings.paths.alt_names_file).unwrap();
        Scraper::new(catalog, None, self.settings.clone(), systems, alt)
    }

    fn gamelist(&self) -> PathBuf {
        self.settings.gamelist_path("megadrive")
    }
}

fn streets_catalog() -> FakeCatalog {
    let mut sor = game("Streets of Rage");
    sor.medias = vec![
        media("ss", "https://x/ss", 320, 224),
        media("box-2D", "https://x/box", 500, 700),
        media("fanart", "https://x/fan", 1920, 1080),
        media("ss", "https://x/ss", 320, 224),
    ];
    FakeCatalog::new()
        .with(CatalogQuery::name("Bare Knuckle", "1"), Reply::Found(sor.clone()))
        .with(CatalogQuery::name("Streets of Rage", "1"), Reply::Found(sor))
        .with_file("https://x/ss", b"SS")
        .with_file("https://x/box", b"BOX")
        .with_file("https://x/fan", b"FAN")
}

fn request(report: &DiagnoseReport, files: Vec<(String, MediaSlot)>) -> ConfirmRequest {
    ConfirmRequest {
        session_id: report.session_id.clone(),
        system: "megadrive".to_string(),
        rom_path: "./bk.zip".to_string(),
        new_name: "Streets of Rage".to_string(),
        new_system: None,
        files,
    }
}

#[tokio::test]
async fn test_diagnose_stages_each_mapped_url_once() {
    let setup = Setup::new();
    let scraper = setup.scraper(streets_catalog());
    let stager = SessionStager::new(&scraper);

    let report = stager.diagnose("Bare Knuckle", "megadrive").await.unwrap();
    assert_eq!(report.game_name.as_deref(), Some("Streets of Rage"));
    assert_eq!(report.files.len(), 2);
    assert_eq!(report.files[0].slots, vec![MediaSlot::Image]);
    assert_eq!(report.files[1].slots, vec![MediaSlot::Thumbnail]);
    assert!(report.files[0].temp_name.ends_with(".png"));
    assert_eq!(scraper.catalog().download_count(), 2);
    assert_eq!(std::fs::read_dir(&report.session_dir).unwrap().count(), 2);
    assert!(report.session_dir.starts_with(&setup.settings.paths.scratch_dir));
}

#[tokio::test]
async fn test_diagnose_unknown_name_gives_empty_session() {
    let setup = Setup::new();
    let scraper = setup.scraper(FakeCatalog::new());
    let stager = SessionStager::new(&scraper);

    let report = stager.diagnose("Nothing", "megadrive").await.unwrap();
    assert!(report.files.is_empty());
    assert!(report.session_dir.is_dir());

    let root = &setup.settings.paths.scratch_dir;
    assert!(cleanup_session(root, &report.session_id).unwrap());
    assert!(!report.session_dir.exists());
    assert!(!cleanup_session(root, &report.session_id).unwrap());
}

#[tokio::test]
async fn test_diagnose_requires_mapped_system() {
    let setup = Setup::new();
    let scraper = setup.scraper(streets_catalog());
    let err = SessionStager::new(&scraper)
        .diagnose("Bare Knuckle", "odyssey")
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Config(_)));
    assert!(!setup.settings.paths.scratch_dir.exists());
}

#[tokio::test]
async fn test_confirm_commits_and_removes_session() {
    let setup = Setup::new();
    std::fs::write(
        setup.gamelist(),
        "<gameList><game><path>./bk.zip</path><name>bk</name></game></gameList>",
    )
    .unwrap();
    let scraper = setup.scraper(streets_catalog());
    let stager = SessionStager::new(&scraper);
    let report = stager.diagnose("Bare Knuckle", "megadrive").await.unwrap();

    let box_art = report.files[1].temp_name.clone();
    let outcome = stager
        .confirm(&request(
            &report,
            vec![
                (box_art.clone(), MediaSlot::Image),
                (box_art, MediaSlot::Thumbnail),
            ],
        ))
        .await
        .unwrap();

    assert!(!report.session_dir.exists());
    assert!(outcome.alt_name_updated);
    assert_eq!(outcome.metadata.unwrap().name, "Streets of Rage");

    let stored = "./downloaded_images/bk-image.png";
    assert_eq!(outcome.media.get(&MediaSlot::Image).map(String::as_str), Some(stored));
    assert_eq!(outcome.media.get(&MediaSlot::Thumbnail).map(String::as_str), Some(stored));
    let media_dir = setup.settings.system_dir("megadrive").join("downloaded_images");
    assert_eq!(std::fs::read(media_dir.join("bk-image.png")).unwrap(), b"BOX");
    assert!(!media_dir.join("bk-thumb.png").exists());

    // Confirmed data overwrites the existing name
    let list = GameList::load(&setup.gamelist()).unwrap();
    let record = list.find("./bk.zip").unwrap();
    assert_eq!(record.name.as_deref(), Some("Streets of Rage"));
    assert_eq!(record.media_path(MediaSlot::Thumbnail), Some(stored));

    let alt = AltNameStore::load(&setup.settings.paths.alt_names_file).unwrap();
    let rows = alt.candidates("bk", "megadrive");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].alt_name, "Streets of Rage");
}

#[tokio::test]
async fn test_confirm_failure_still_removes_session() {
    let setup = Setup::new();
    std::fs::write(setup.gamelist(), "garbage").unwrap();
    let scraper = setup.scraper(streets_catalog());
    let stager = SessionStager::new(&scraper);
    let report = stager.diagnose("Bare Knuckle", "megadrive").await.unwrap();

    let err = stager
        .confirm(&request(
            &report,
            vec![(report.files[0].temp_name.clone(), MediaSlot::Image)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::PartialCommit { moved: 1, .. }));
    assert!(!report.session_dir.exists());
    assert_eq!(std::fs::read_to_string(setup.gamelist()).unwrap(), "garbage");
}

#[tokio::test]
async fn test_confirm_without_metadata_merges_media_only() {
    let setup = Setup::new();
    let scraper = setup.scraper(streets_catalog());
    let stager = SessionStager::new(&scraper);
    let report = stager.diagnose("Bare Knuckle", "megadrive").await.unwrap();

    let mut req = request(
        &report,
        vec![(report.files[0].temp_name.clone(), MediaSlot::Image)],
    );
    req.new_name = "bk".to_string();
    req.new_system = Some("mastersystem".to_string());
    let outcome = stager.confirm(&req).await.unwrap();

    assert!(outcome.metadata.is_none());
    assert!(outcome.alt_name_updated);
    let list = GameList::load(&setup.gamelist()).unwrap();
    let record = list.find("./bk.zip").unwrap();
    assert_eq!(record.name, None);
    assert_eq!(
        record.media_path(MediaSlot::Image),
        Some("./downloaded_images/bk-image.png")
    );

    let alt = AltNameStore::load(&setup.settings.paths.alt_names_file).unwrap();
    assert_eq!(
        alt.candidates("bk", "megadrive")[0].target_system.as_deref(),
        Some("mastersystem")
    );
}

#[tokio::test]
async fn test_confirm_rejects_bad_ids_and_names() {
    let setup = Setup::new();
    let scraper = setup.scraper(streets_catalog());
    let stager = SessionStager::new(&scraper);

    let mut req = ConfirmRequest {
        session_id: "../../etc".to_string(),
        system: "megadrive".to_string(),
        rom_path: "./bk.zip".to_string(),
        new_name: "bk".to_string(),
        new_system: None,
        files: Vec::new(),
    };
    assert!(matches!(
        stager.confirm(&req).await,
        Err(ScrapeError::InvalidSession(_))
    ));

    let report = stager.diagnose("Bare Knuckle", "megadrive").await.unwrap();
    req.session_id = report.session_id.clone();
    req.files = vec![("../gamelist.xml".to_string(), MediaSlot::Image)];
    assert!(matches!(
        stager.confirm(&req).await,
        Err(ScrapeError::InvalidSession(_))
    ));
    assert!(!report.session_dir.exists());
}

#[test]
fn test_sweep_removes_only_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let id = Uuid::new_v4().to_string();
    std::fs::create_dir_all(root.join(&id)).unwrap();
    std::fs::write(root.join(&id).join("a.png"), b"x").unwrap();
    std::fs::create_dir_all(root.join("keep-me")).unwrap();

    assert_eq!(sweep_sessions(root).unwrap(), 1);
    assert!(!root.join(&id).exists());
    assert!(root.join("keep-me").exists());
    assert_eq!(sweep_sessions(&root.join("missing")).unwrap(), 0);
}

#[test]
fn test_session_dir_validates_uuid() {
    let root = Path::new("/scratch");
    assert!(session_dir(root, "not-a-uuid").is_err());
    let id = Uuid::new_v4().to_string();
    assert_eq!(session_dir(root, &id).unwrap(), root.join(&id));
}
