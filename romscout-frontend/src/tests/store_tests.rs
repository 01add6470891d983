use super::*;
use std::path::Path;

fn layout(root: &Path) -> MediaLayout {
    let media = root.join("downloaded_images");
    std::fs::create_dir_all(&media).unwrap();
    MediaLayout::new(root, media)
}

fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"x").unwrap();
}

fn named_record(name: &str) -> GameRecord {
    let mut record = GameRecord::new("./Sonic.zip");
    record.name = Some(name.to_string());
    record
}

const ALL: [MediaSlot; 4] = MediaSlot::ALL;

#[test]
fn test_merge_keeps_user_metadata_by_default() {
    let existing = named_record("My Sonic");
    let update = RecordUpdate {
        metadata: Some(GameMetadata::named("Sonic the Hedgehog")),
        media: BTreeMap::from([(MediaSlot::Image, "./downloaded_images/Sonic-image.png".into())]),
    };
    let merged = merge(Some(&existing), "./Sonic.zip", &update, MergeMode::default());
    assert_eq!(merged.name.as_deref(), Some("My Sonic"));
    assert_eq!(
        merged.media_path(MediaSlot::Image),
        Some("./downloaded_images/Sonic-image.png")
    );
}

#[test]
fn test_merge_force_metadata_overwrites_name() {
    let existing = named_record("My Sonic");
    let update = RecordUpdate {
        metadata: Some(GameMetadata::named("Sonic the Hedgehog")),
        media: BTreeMap::new(),
    };
    let mode = MergeMode {
        force_metadata: true,
        ..Default::default()
    };
    let merged = merge(Some(&existing), "./Sonic.zip", &update, mode);
    assert_eq!(merged.name.as_deref(), Some("Sonic the Hedgehog"));
}

#[test]
fn test_merge_creates_missing_record() {
    let update = RecordUpdate {
        metadata: Some(GameMetadata::named("Sonic")),
        media: BTreeMap::new(),
    };
    let merged = merge(None, "./Sonic.zip", &update, MergeMode::default());
    assert_eq!(merged.path, "./Sonic.zip");
    assert_eq!(merged.name.as_deref(), Some("Sonic"));
}

#[test]
fn test_merge_is_idempotent() {
    let existing = named_record("Sonic");
    let update = RecordUpdate {
        metadata: Some(GameMetadata::named("Sonic")),
        media: BTreeMap::from([(MediaSlot::Video, "./downloaded_images/Sonic-video.mp4".into())]),
    };
    let once = merge(Some(&existing), "./Sonic.zip", &update, MergeMode::default());
    let twice = merge(Some(&once), "./Sonic.zip", &update, MergeMode::default());
    assert_eq!(once, twice);
}

#[test]
fn test_ensure_named() {
    let mut record = GameRecord::new("./Sonic.zip");
    assert!(ensure_named(&mut record, "Sonic"));
    assert!(!ensure_named(&mut record, "Other"));
    assert_eq!(record.name.as_deref(), Some("Sonic"));
}

#[test]
fn test_relative_paths_are_dot_prefixed() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    let file = layout.media_file("Sonic", MediaSlot::Thumbnail, "png");
    assert_eq!(file, dir.path().join("downloaded_images").join("Sonic-thumb.png"));
    assert_eq!(layout.relative(&file), "./downloaded_images/Sonic-thumb.png");
}

#[test]
fn test_no_record_proceeds() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    let decision = skip_decision(None, "Sonic", &ALL, MergeMode::default(), &layout);
    assert_eq!(decision, SkipDecision::Proceed);
}

#[test]
fn test_skip_links_conventional_local_files() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    for slot in ALL {
        touch(&layout.media_file("Sonic", slot, slot.default_extension()));
    }
    // A second image format sorts after .png and is ignored
    touch(&layout.media_file("Sonic", MediaSlot::Image, "webp"));

    let record = named_record("Sonic");
    let decision = skip_decision(Some(&record), "Sonic", &ALL, MergeMode::default(), &layout);
    let SkipDecision::LinkLocal { media } = decision else {
        panic!("expected LinkLocal, got {:?}", decision);
    };
    assert_eq!(media.len(), 4);
    assert_eq!(media[&MediaSlot::Image], "./downloaded_images/Sonic-image.png");
    assert_eq!(media[&MediaSlot::Video], "./downloaded_images/Sonic-video.mp4");
}

#[test]
fn test_skip_is_complete_once_linked() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    let mut record = named_record("Sonic");
    for slot in ALL {
        let file = layout.media_file("Sonic", slot, "png");
        touch(&file);
        record.media.insert(slot, layout.relative(&file));
    }
    let decision = skip_decision(Some(&record), "Sonic", &ALL, MergeMode::default(), &layout);
    assert_eq!(decision, SkipDecision::Complete);
    assert!(decision.is_skip());
}

#[test]
fn test_missing_slot_file_proceeds() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    let mut record = named_record("Sonic");
    record
        .media
        .insert(MediaSlot::Image, "./downloaded_images/gone.png".to_string());
    let decision = skip_decision(
        Some(&record),
        "Sonic",
        &[MediaSlot::Image],
        MergeMode::default(),
        &layout,
    );
    assert_eq!(decision, SkipDecision::Proceed);
}

#[test]
fn test_only_requested_slots_matter() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    touch(&layout.media_file("Sonic", MediaSlot::Image, "png"));
    let record = named_record("Sonic");
    let decision = skip_decision(
        Some(&record),
        "Sonic",
        &[MediaSlot::Image],
        MergeMode::default(),
        &layout,
    );
    assert!(matches!(decision, SkipDecision::LinkLocal { .. }));
}

#[test]
fn test_unnamed_record_with_all_media_is_complete() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    let mut record = GameRecord::new("./Sonic.zip");
    let file = layout.media_file("Sonic", MediaSlot::Image, "png");
    touch(&file);
    record.media.insert(MediaSlot::Image, layout.relative(&file));
    let decision = skip_decision(
        Some(&record),
        "Sonic",
        &[MediaSlot::Image],
        MergeMode::default(),
        &layout,
    );
    assert_eq!(decision, SkipDecision::Complete);
}

#[test]
fn test_force_always_proceeds() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    let mut record = named_record("Sonic");
    let file = layout.media_file("Sonic", MediaSlot::Image, "png");
    touch(&file);
    record.media.insert(MediaSlot::Image, layout.relative(&file));
    let mode = MergeMode {
        force: true,
        ..Default::default()
    };
    let decision = skip_decision(Some(&record), "Sonic", &[MediaSlot::Image], mode, &layout);
    assert_eq!(decision, SkipDecision::Proceed);
}

#[test]
fn test_stock_art_is_replaced_only_when_requested() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    let stock = dir.path().join("stock").join("sonic.png");
    touch(&stock);
    let mut record = GameRecord::new("./Sonic.zip");
    record
        .media
        .insert(MediaSlot::Image, stock.to_string_lossy().into_owned());

    let keep = skip_decision(
        Some(&record),
        "Sonic",
        &[MediaSlot::Image],
        MergeMode::default(),
        &layout,
    );
    assert_eq!(keep, SkipDecision::Complete);

    let replace = MergeMode {
        replace_stock: true,
        ..Default::default()
    };
    let decision = skip_decision(Some(&record), "Sonic", &[MediaSlot::Image], replace, &layout);
    assert_eq!(decision, SkipDecision::Proceed);
    assert!(slot_wants_download(Some(&record), MediaSlot::Image, replace, &layout));
    assert!(!slot_wants_download(
        Some(&record),
        MediaSlot::Image,
        MergeMode::default(),
        &layout
    ));
}

#[test]
fn test_named_record_with_stock_art_is_satisfied() {
    let dir = tempfile::tempdir().unwrap();
    let layout = layout(dir.path());
    let stock = dir.path().join("stock").join("sonic.png");
    touch(&stock);
    let mut record = named_record("Sonic");
    record
        .media
        .insert(MediaSlot::Image, stock.to_string_lossy().into_owned());

    let replace = MergeMode {
        replace_stock: true,
        ..Default::default()
    };
    let decision = skip_decision(Some(&record), "Sonic", &[MediaSlot::Image], replace, &layout);
    assert_eq!(decision, SkipDecision::Complete);
    assert!(decision.is_skip());
}
