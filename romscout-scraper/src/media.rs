use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use romscout_frontend::MediaSlot;

use crate::catalog::Catalog;
use crate::error::ScrapeError;
use crate::types::{GameInfo, MediaCandidate};

/// How one candidate is picked when the catalog offers several for a slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    First,
    Last,
    LargestSize,
    SmallestSize,
    #[default]
    BestResolution,
}

impl SelectionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionStrategy::First => "first",
            SelectionStrategy::Last => "last",
            SelectionStrategy::LargestSize => "largest_size",
            SelectionStrategy::SmallestSize => "smallest_size",
            SelectionStrategy::BestResolution => "best_resolution",
        }
    }
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            "largest_size" => Ok(Self::LargestSize),
            "smallest_size" => Ok(Self::SmallestSize),
            "best_resolution" => Ok(Self::BestResolution),
            other => Err(format!("unknown selection strategy '{}'", other)),
        }
    }
}

/// Pick one candidate. Ties keep the earliest candidate in list order.
pub fn select<'a>(
    strategy: SelectionStrategy,
    candidates: &[&'a MediaCandidate],
) -> Option<&'a MediaCandidate> {
    match strategy {
        SelectionStrategy::First => candidates.first().copied(),
        SelectionStrategy::Last => candidates.last().copied(),
        SelectionStrategy::LargestSize => pick_by(candidates, |c, best| c.size > best.size),
        SelectionStrategy::SmallestSize => pick_by(candidates, |c, best| c.size < best.size),
        SelectionStrategy::BestResolution => pick_by(candidates, |c, best| c.area() > best.area()),
    }
}

// Only a strictly better candidate replaces the current pick
fn pick_by<'a>(
    candidates: &[&'a MediaCandidate],
    better: impl Fn(&MediaCandidate, &MediaCandidate) -> bool,
) -> Option<&'a MediaCandidate> {
    candidates.iter().copied().fold(None, |best, c| match best {
        Some(b) if !better(c, b) => Some(b),
        _ => Some(c),
    })
}

/// Per-slot selection strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSelector {
    pub image: SelectionStrategy,
    pub video: SelectionStrategy,
    pub marquee: SelectionStrategy,
    pub thumbnail: SelectionStrategy,
}

impl MediaSelector {
    pub fn strategy(&self, slot: MediaSlot) -> SelectionStrategy {
        match slot {
            MediaSlot::Image => self.image,
            MediaSlot::Video => self.video,
            MediaSlot::Marquee => self.marquee,
            MediaSlot::Thumbnail => self.thumbnail,
        }
    }

    /// Select the candidate for `slot` using that slot's strategy.
    pub fn select<'a>(
        &self,
        slot: MediaSlot,
        candidates: &[&'a MediaCandidate],
    ) -> Option<&'a MediaCandidate> {
        select(self.strategy(slot), candidates)
    }
}

/// Which catalog media kinds feed which slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMapping {
    pub image_source: String,
    pub thumbnail_source: String,
    pub video_sources: Vec<String>,
    pub marquee_sources: Vec<String>,
}

impl Default for MediaMapping {
    fn default() -> Self {
        Self {
            image_source: "ss".to_string(),
            thumbnail_source: "box-2D".to_string(),
            video_sources: vec!["video".to_string()],
            marquee_sources: vec!["wheel".to_string(), "wheel-hd".to_string()],
        }
    }
}

impl MediaMapping {
    /// Slots a catalog media kind can fill. One kind may feed several slots.
    pub fn slots_for(&self, kind: &str) -> Vec<MediaSlot> {
        let mut slots = Vec::new();
        if kind == self.image_source {
            slots.push(MediaSlot::Image);
        }
        if kind == self.thumbnail_source {
            slots.push(MediaSlot::Thumbnail);
        }
        if self.video_sources.iter().any(|k| k == kind) {
            slots.push(MediaSlot::Video);
        }
        if self.marquee_sources.iter().any(|k| k == kind) {
            slots.push(MediaSlot::Marquee);
        }
        slots
    }

    /// Group a game's downloadable media by the requested slots, keeping
    /// catalog order within each slot.
    pub fn candidates<'a>(
        &self,
        game: &'a GameInfo,
        requested: &[MediaSlot],
    ) -> BTreeMap<MediaSlot, Vec<&'a MediaCandidate>> {
        let mut by_slot: BTreeMap<MediaSlot, Vec<&MediaCandidate>> = BTreeMap::new();
        for media in game.medias.iter().filter(|m| !m.url.is_empty()) {
            for slot in self.slots_for(&media.kind) {
                if requested.contains(&slot) {
                    by_slot.entry(slot).or_default().push(media);
                }
            }
        }
        by_slot
    }
}

/// File extension for a candidate, falling back to the slot default when
/// the catalog reports none.
pub fn media_extension(candidate: &MediaCandidate, slot: MediaSlot) -> String {
    let format: String = candidate
        .format
        .trim()
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if format.is_empty() {
        slot.default_extension().to_string()
    } else {
        format.to_ascii_lowercase()
    }
}

/// URLs already fetched during one resolution, with their local files.
#[derive(Debug, Default)]
pub struct DownloadCache {
    fetched: HashMap<String, PathBuf>,
}

impl DownloadCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<&Path> {
        self.fetched.get(url).map(PathBuf::as_path)
    }
}

/// Download `url` to `dest`, unless this resolution already fetched it, in
/// which case the earlier local file is returned.
///
/// The second value is `true` when a new file was written.
pub async fn fetch_media<C: Catalog>(
    catalog: &C,
    cache: &mut DownloadCache,
    url: &str,
    dest: &Path,
) -> Result<(PathBuf, bool), ScrapeError> {
    if let Some(existing) = cache.get(url) {
        log::debug!("Reusing {} for {}", existing.display(), url);
        return Ok((existing.to_path_buf(), false));
    }

    let bytes = catalog.download(url).await?;
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(dest, &bytes)?;
    cache.fetched.insert(url.to_string(), dest.to_path_buf());
    Ok((dest.to_path_buf(), true))
}

#[cfg(test)]
#[path = "tests/media_tests.rs"]
mod tests;
