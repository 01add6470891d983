use super::*;
use crate::fakes::{FakeCatalog, game, media};

fn sized(url: &str, size: u64) -> MediaCandidate {
    MediaCandidate {
        size,
        ..media("ss", url, 0, 0)
    }
}

#[test]
fn test_best_resolution_prefers_larger_area() {
    let small = media("ss", "a", 100, 100);
    let wide = media("ss", "b", 200, 60);
    assert_eq!(
        select(SelectionStrategy::BestResolution, &[&small, &wide]).unwrap().url,
        "b"
    );
}

#[test]
fn test_ties_keep_first_candidate() {
    let a = sized("a", 0);
    let b = sized("b", 0);
    let c = sized("c", 0);
    let all = [&a, &b, &c];
    assert_eq!(select(SelectionStrategy::LargestSize, &all).unwrap().url, "a");
    assert_eq!(select(SelectionStrategy::SmallestSize, &all).unwrap().url, "a");
    assert_eq!(select(SelectionStrategy::BestResolution, &all).unwrap().url, "a");
    assert_eq!(select(SelectionStrategy::Last, &all).unwrap().url, "c");
}

#[test]
fn test_size_strategies() {
    let a = sized("a", 300);
    let b = sized("b", 900);
    let c = sized("c", 100);
    let all = [&a, &b, &c];
    assert_eq!(select(SelectionStrategy::LargestSize, &all).unwrap().url, "b");
    assert_eq!(select(SelectionStrategy::SmallestSize, &all).unwrap().url, "c");
    assert!(select(SelectionStrategy::First, &[]).is_none());
}

#[test]
fn test_strategy_names_parse() {
    assert_eq!(
        "smallest_size".parse::<SelectionStrategy>().unwrap(),
        SelectionStrategy::SmallestSize
    );
    assert!("biggest".parse::<SelectionStrategy>().is_err());
}

#[test]
fn test_one_kind_can_feed_several_slots() {
    let mapping = MediaMapping {
        image_source: "box-2D".to_string(),
        ..MediaMapping::default()
    };
    assert_eq!(
        mapping.slots_for("box-2D"),
        vec![MediaSlot::Image, MediaSlot::Thumbnail]
    );
    assert_eq!(mapping.slots_for("wheel-hd"), vec![MediaSlot::Marquee]);
    assert!(mapping.slots_for("fanart").is_empty());
}

#[test]
fn test_candidates_filter_requested_and_empty_urls() {
    let mut info = game("Sonic");
    info.medias = vec![
        media("ss", "https://x/ss1", 320, 224),
        media("ss", "", 640, 480),
        media("wheel", "https://x/wheel", 400, 150),
        media("box-2D", "https://x/box", 500, 700),
        media("video", "https://x/video", 0, 0),
    ];
    let by_slot = MediaMapping::default().candidates(&info, &[MediaSlot::Image, MediaSlot::Marquee]);

    assert_eq!(by_slot.len(), 2);
    assert_eq!(by_slot[&MediaSlot::Image].len(), 1);
    assert_eq!(by_slot[&MediaSlot::Marquee][0].url, "https://x/wheel");
}

#[test]
fn test_media_extension_falls_back_to_slot_default() {
    let mut cand = media("video", "u", 0, 0);
    cand.format = "MP4".to_string();
    assert_eq!(media_extension(&cand, MediaSlot::Video), "mp4");
    cand.format = String::new();
    assert_eq!(media_extension(&cand, MediaSlot::Video), "mp4");
    assert_eq!(media_extension(&cand, MediaSlot::Image), "png");
}

#[tokio::test]
async fn test_fetch_media_downloads_each_url_once() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FakeCatalog::new().with_file("https://x/box", b"PNG");
    let mut cache = DownloadCache::new();

    let first = dir.path().join("media").join("sonic-image.png");
    let (path, new) = fetch_media(&catalog, &mut cache, "https://x/box", &first)
        .await
        .unwrap();
    assert!(new);
    assert_eq!(path, first);
    assert_eq!(std::fs::read(&first).unwrap(), b"PNG");

    let second = dir.path().join("media").join("sonic-thumb.png");
    let (path, new) = fetch_media(&catalog, &mut cache, "https://x/box", &second)
        .await
        .unwrap();
    assert!(!new);
    assert_eq!(path, first);
    assert!(!second.exists());
    assert_eq!(catalog.download_count(), 1);
    assert_eq!(cache.get("https://x/box"), Some(first.as_path()));
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FakeCatalog::new();
    let mut cache = DownloadCache::new();

    let dest = dir.path().join("x.png");
    assert!(fetch_media(&catalog, &mut cache, "https://x/missing", &dest).await.is_err());
    assert!(cache.get("https://x/missing").is_none());
    assert!(!dest.exists());
}
