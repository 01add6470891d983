//! Per-system listing of stored records and the state of their media.

use std::path::Path;

use serde::Serialize;

use crate::{GameList, GameRecord, MediaLayout, MediaSlot};

/// One media slot of a listed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
    pub slot: MediaSlot,
    /// Path as stored in the gamelist
    pub stored: Option<String>,
    /// Whether the stored path points at an existing file
    pub exists: bool,
}

/// A `<game>` entry as shown in a library listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryEntry {
    pub rom_path: String,
    /// Stored name, or the ROM file stem when the record has none
    pub name: String,
    pub slots: Vec<SlotStatus>,
}

impl InventoryEntry {
    /// Slots among `wanted` without a file on disk.
    pub fn missing(&self, wanted: &[MediaSlot]) -> Vec<MediaSlot> {
        self.slots
            .iter()
            .filter(|s| wanted.contains(&s.slot) && !s.exists)
            .map(|s| s.slot)
            .collect()
    }
}

/// List every live game record with the state of its four media slots.
/// Entries marked `deleted="yes"` or lacking a path are left out.
pub fn inventory(list: &GameList, layout: &MediaLayout) -> Vec<InventoryEntry> {
    list.games
        .iter()
        .filter(|record| !record.path.is_empty() && !is_deleted(record))
        .map(|record| InventoryEntry {
            rom_path: record.path.clone(),
            name: display_name(record),
            slots: MediaSlot::ALL
                .into_iter()
                .map(|slot| {
                    let stored = record.media_path(slot).map(str::to_string);
                    let exists = stored
                        .as_deref()
                        .is_some_and(|p| layout.resolve(p).exists());
                    SlotStatus {
                        slot,
                        stored,
                        exists,
                    }
                })
                .collect(),
        })
        .collect()
}

fn is_deleted(record: &GameRecord) -> bool {
    record
        .attributes
        .iter()
        .any(|(key, value)| key == "deleted" && value == "yes")
}

fn display_name(record: &GameRecord) -> String {
    match record.name.as_deref() {
        Some(name) if record.has_name() => name.to_string(),
        _ => Path::new(&record.path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| record.path.clone()),
    }
}
