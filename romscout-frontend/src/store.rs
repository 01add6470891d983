//! Merge and skip rules for descriptor records.
//!
//! `skip_decision` runs before any network work and decides whether a ROM
//! needs scraping at all; `merge` folds freshly scraped data into an
//! existing record without clobbering user edits unless asked to.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{GameMetadata, GameRecord, MediaSlot};

/// Overwrite switches for one scrape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeMode {
    /// Re-download media and rewrite metadata even when present
    pub force: bool,
    /// Rewrite metadata even when the record already has a name
    pub force_metadata: bool,
    /// Treat absolute (stock) media paths as missing
    pub replace_stock: bool,
}

impl MergeMode {
    /// Mode used when a human confirms a match: everything overwrites.
    pub fn confirmed() -> Self {
        Self {
            force: true,
            force_metadata: true,
            replace_stock: true,
        }
    }

    fn overwrites_metadata(&self) -> bool {
        self.force || self.force_metadata
    }
}

/// Fields obtained for one record during a scrape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordUpdate {
    /// Catalog metadata, if the ROM was resolved
    pub metadata: Option<GameMetadata>,
    /// Store-relative media paths obtained for each slot
    pub media: BTreeMap<MediaSlot, String>,
}

impl RecordUpdate {
    pub fn is_empty(&self) -> bool {
        self.metadata.is_none() && self.media.is_empty()
    }
}

/// Merge `update` into `existing` (or a new record for `rom_path`).
///
/// Metadata is only written when the record has no name yet or the mode
/// forces it. Every media path in the update is written; deciding which
/// slots deserve a new file is the caller's job.
pub fn merge(
    existing: Option<&GameRecord>,
    rom_path: &str,
    update: &RecordUpdate,
    mode: MergeMode,
) -> GameRecord {
    let mut record = existing
        .cloned()
        .unwrap_or_else(|| GameRecord::new(rom_path));

    if let Some(meta) = &update.metadata {
        if !record.has_name() || mode.overwrites_metadata() {
            record.apply_metadata(meta);
        }
    }
    for (slot, path) in &update.media {
        record.media.insert(*slot, path.clone());
    }
    record
}

/// Give a record a display name if it has none. Returns `true` if changed.
pub fn ensure_named(record: &mut GameRecord, fallback: &str) -> bool {
    if record.has_name() {
        return false;
    }
    record.name = Some(fallback.to_string());
    true
}

/// Outcome of the pre-scrape check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipDecision {
    /// Name present and every requested slot has a file on disk. `media`
    /// holds conventionally-named local files to link into the record.
    LinkLocal { media: BTreeMap<MediaSlot, String> },
    /// Every requested slot already points at an existing file.
    Complete,
    /// Resolution and download are needed.
    Proceed,
}

impl SkipDecision {
    pub fn is_skip(&self) -> bool {
        !matches!(self, SkipDecision::Proceed)
    }

    /// Human-readable reason, as shown in the progress stream.
    pub fn reason(&self) -> &'static str {
        match self {
            SkipDecision::LinkLocal { .. } => "Metadata present. Linking existing local media",
            SkipDecision::Complete => "All media files are present and no action is required",
            SkipDecision::Proceed => "Scraping required",
        }
    }
}

/// Where a library keeps its descriptor store and media files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaLayout {
    /// Directory containing `gamelist.xml`; relative paths resolve here
    pub gamelist_dir: PathBuf,
    /// Directory media files are written to
    pub media_dir: PathBuf,
}

impl MediaLayout {
    pub fn new(gamelist_dir: impl Into<PathBuf>, media_dir: impl Into<PathBuf>) -> Self {
        Self {
            gamelist_dir: gamelist_dir.into(),
            media_dir: media_dir.into(),
        }
    }

    /// Resolve a stored path (absolute or `./`-relative) to a filesystem path.
    pub fn resolve(&self, stored: &str) -> PathBuf {
        let stored = Path::new(stored);
        if stored.is_absolute() {
            stored.to_path_buf()
        } else {
            self.gamelist_dir.join(stored)
        }
    }

    /// Express a file path the way the store records it: `./a/b.ext`.
    pub fn relative(&self, file: &Path) -> String {
        let rel = pathdiff::diff_paths(file, &self.gamelist_dir)
            .unwrap_or_else(|| file.to_path_buf());
        let rel = rel.to_string_lossy().replace('\\', "/");
        if rel.starts_with("./") || rel.starts_with("../") || rel.starts_with('/') {
            rel
        } else {
            format!("./{}", rel)
        }
    }

    /// Destination of a media file: `<media_dir>/<stem>-<suffix>.<ext>`.
    pub fn media_file(&self, stem: &str, slot: MediaSlot, extension: &str) -> PathBuf {
        self.media_dir
            .join(format!("{}-{}.{}", stem, slot.file_suffix(), extension))
    }

    /// Find an existing conventionally-named file for a slot. When several
    /// extensions exist the lexicographically first one wins.
    pub fn find_local(&self, stem: &str, slot: MediaSlot) -> Option<PathBuf> {
        let prefix = format!("{}-{}.", stem, slot.file_suffix());
        let mut matches: Vec<PathBuf> = fs::read_dir(&self.media_dir)
            .ok()?
            .flatten()
            .filter(|entry| {
                entry.file_name().to_string_lossy().starts_with(&prefix)
                    && entry.path().is_file()
            })
            .map(|entry| entry.path())
            .collect();
        matches.sort();
        matches.into_iter().next()
    }

    fn stored_file_exists(&self, stored: &str) -> bool {
        self.resolve(stored).is_file()
    }
}

/// Whether a stored media path is absolute (externally seeded stock art).
pub fn is_stock_path(stored: &str) -> bool {
    stored.starts_with('/') || Path::new(stored).is_absolute()
}

/// Decide whether a ROM can skip the network entirely.
///
/// Evaluated against the record as currently stored; `requested` is the set
/// of slots enabled for this run.
pub fn skip_decision(
    record: Option<&GameRecord>,
    stem: &str,
    requested: &[MediaSlot],
    mode: MergeMode,
    layout: &MediaLayout,
) -> SkipDecision {
    let Some(record) = record else {
        return SkipDecision::Proceed;
    };

    // (slot, stored path) for slots whose file is on disk
    let present: BTreeMap<MediaSlot, &str> = requested
        .iter()
        .filter_map(|slot| record.media_path(*slot).map(|p| (*slot, p)))
        .filter(|(_, p)| layout.stored_file_exists(p))
        .collect();
    let stock_needs_replacing =
        mode.replace_stock && present.values().any(|p| is_stock_path(p));

    if record.has_name() && !mode.overwrites_metadata() {
        let mut linked = BTreeMap::new();
        let mut satisfied = true;
        for slot in requested {
            if present.contains_key(slot) {
                continue;
            }
            match layout.find_local(stem, *slot) {
                Some(file) => {
                    linked.insert(*slot, layout.relative(&file));
                }
                None => {
                    satisfied = false;
                    break;
                }
            }
        }
        if satisfied {
            // Already linked to exactly these files: nothing to write
            linked.retain(|slot, path| record.media_path(*slot) != Some(path.as_str()));
            return if linked.is_empty() {
                SkipDecision::Complete
            } else {
                SkipDecision::LinkLocal { media: linked }
            };
        }
    }

    if !mode.force && present.len() == requested.len() && !stock_needs_replacing {
        return SkipDecision::Complete;
    }
    SkipDecision::Proceed
}

/// Whether a slot should receive a freshly downloaded file.
pub fn slot_wants_download(
    record: Option<&GameRecord>,
    slot: MediaSlot,
    mode: MergeMode,
    layout: &MediaLayout,
) -> bool {
    if mode.force {
        return true;
    }
    match record.and_then(|r| r.media_path(slot)) {
        Some(stored) if layout.stored_file_exists(stored) => {
            mode.replace_stock && is_stock_path(stored)
        }
        _ => true,
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
