//! Per-ROM scrape pipeline: skip check, resolution, media download, merge.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use romscout_core::RomIdentity;
use romscout_core::util::library_relative_path;
use romscout_frontend::{
    GameList, MediaLayout, MediaSlot, MergeMode, RecordUpdate, SkipDecision,
    ensure_named, merge, skip_decision, slot_wants_download,
};

use crate::alt_names::AltNameStore;
use crate::catalog::Catalog;
use crate::error::ScrapeError;
use crate::events::{ProgressSink, ScrapeEvent};
use crate::guess::TitleGuesser;
use crate::lookup::{LookupMethod, Resolution, Resolver};
use crate::media::{DownloadCache, fetch_media, media_extension};
use crate::settings::Settings;
use crate::systems::SystemMapping;
use crate::types::GameInfo;

/// What happened to one ROM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RomOutcome {
    /// Local media files were linked without touching the network
    Linked { slots: usize },
    /// Nothing to do
    Skipped,
    /// Matched in the catalog and merged
    Scraped {
        method: LookupMethod,
        downloaded: usize,
    },
    NoMatch,
    Cancelled,
}

/// Everything needed to scrape ROMs of any system.
pub struct Scraper<C, G> {
    catalog: C,
    guesser: Option<G>,
    settings: Settings,
    systems: SystemMapping,
    alt_names: Mutex<AltNameStore>,
}

impl<C: Catalog, G: TitleGuesser> Scraper<C, G> {
    pub fn new(
        catalog: C,
        guesser: Option<G>,
        settings: Settings,
        systems: SystemMapping,
        alt_names: AltNameStore,
    ) -> Self {
        Self {
            catalog,
            guesser,
            settings,
            systems,
            alt_names: Mutex::new(alt_names),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn systems(&self) -> &SystemMapping {
        &self.systems
    }

    pub fn alt_names(&self) -> &Mutex<AltNameStore> {
        &self.alt_names
    }

    pub fn has_guesser(&self) -> bool {
        self.guesser.is_some()
    }

    pub fn resolver(&self) -> Resolver<'_, C, G> {
        Resolver {
            catalog: &self.catalog,
            guesser: self.guesser.as_ref(),
            systems: &self.systems,
            alt_names: &self.alt_names,
        }
    }

    /// Every ROM file under a system folder, in path order.
    pub fn scan_system(&self, system: &str) -> Result<Vec<PathBuf>, ScrapeError> {
        let extensions = romscout_core::extension_set(&self.settings.media.rom_extensions);
        let files = romscout_core::scan_rom_files(
            &self.settings.system_dir(system),
            &extensions,
            &self.settings.scan_skip_dirs(),
        )?;
        Ok(files)
    }

    /// Scrape one ROM file of `system` into that system's gamelist.
    pub async fn scrape_rom(
        &self,
        system: &str,
        rom_file: &Path,
        mode: MergeMode,
        progress: &ProgressSink,
    ) -> Result<RomOutcome, ScrapeError> {
        let system_dir = self.settings.system_dir(system);
        let gamelist_path = self.settings.gamelist_path(system);
        let rom_path = library_relative_path(&system_dir, rom_file);
        let stem = RomIdentity::from_library_path(&rom_path).stem;
        let layout = self.settings.media_layout(system, &rom_path);
        let requested = self.settings.requested_slots();

        let mut list = GameList::load(&gamelist_path)?;
        match skip_decision(list.find(&rom_path), &stem, &requested, mode, &layout) {
            SkipDecision::LinkLocal { media } => {
                let slots = media.len();
                let update = RecordUpdate {
                    metadata: None,
                    media,
                };
                let record = merge(list.find(&rom_path), &rom_path, &update, mode);
                list.upsert(record);
                list.save(&gamelist_path)?;
                progress.emit(ScrapeEvent::Linked { stem, slots });
                return Ok(RomOutcome::Linked { slots });
            }
            decision @ SkipDecision::Complete => {
                if let Some(record) = list.find_mut(&rom_path) {
                    if ensure_named(record, &stem) {
                        list.save(&gamelist_path)?;
                    }
                }
                progress.emit(ScrapeEvent::Skipped {
                    stem,
                    reason: decision.reason(),
                });
                return Ok(RomOutcome::Skipped);
            }
            SkipDecision::Proceed => {}
        }

        progress.emit(ScrapeEvent::Processing { stem: stem.clone() });
        let rom = identify(&system_dir, rom_file).await?;

        let result = match self.resolver().resolve(&rom, system, progress).await? {
            Resolution::Matched(result) => result,
            Resolution::Cancelled => return Ok(RomOutcome::Cancelled),
            Resolution::NoMatch => {
                progress.emit(ScrapeEvent::NoMatch { stem });
                if !self.has_guesser() {
                    progress.emit(ScrapeEvent::GuessTip);
                }
                return Ok(RomOutcome::NoMatch);
            }
        };

        let wanted: Vec<MediaSlot> = requested
            .iter()
            .copied()
            .filter(|slot| slot_wants_download(list.find(&rom_path), *slot, mode, &layout))
            .collect();
        let (media, downloaded) = self
            .download_media(&result.game, &rom.stem, &wanted, mode, &layout, progress)
            .await;

        let update = RecordUpdate {
            metadata: Some(
                result
                    .game
                    .to_metadata(self.settings.general.catalog_language(), &rom.stem),
            ),
            media,
        };

        // Re-read: the store may have changed while the catalog was queried
        list = GameList::load(&gamelist_path)?;
        let existing = list.find(&rom_path).cloned();
        let record = merge(existing.as_ref(), &rom_path, &update, mode);
        if existing.as_ref() != Some(&record) {
            list.upsert(record);
            list.save(&gamelist_path)?;
        }
        progress.emit(ScrapeEvent::Updated {
            stem: rom.stem.clone(),
            downloaded,
        });

        Ok(RomOutcome::Scraped {
            method: result.method,
            downloaded,
        })
    }

    /// Fetch the selected candidate for each wanted slot. Returns the
    /// store-relative paths obtained and the number of new files written.
    async fn download_media(
        &self,
        game: &GameInfo,
        stem: &str,
        wanted: &[MediaSlot],
        mode: MergeMode,
        layout: &MediaLayout,
        progress: &ProgressSink,
    ) -> (BTreeMap<MediaSlot, String>, usize) {
        let mapping = self.settings.media_mapping();
        let by_slot = mapping.candidates(game, wanted);
        let mut cache = DownloadCache::new();
        let mut media = BTreeMap::new();
        let mut downloaded = 0;

        for slot in wanted {
            let Some(candidates) = by_slot.get(slot) else {
                continue;
            };
            let Some(choice) = self.settings.selection.select(*slot, candidates) else {
                continue;
            };
            let dest = layout.media_file(stem, *slot, &media_extension(choice, *slot));
            let file_name = display_name(&dest);

            if !mode.force && cache.get(&choice.url).is_none() && dest.is_file() {
                progress.emit(ScrapeEvent::MediaExists { file: file_name });
                media.insert(*slot, layout.relative(&dest));
                continue;
            }

            match fetch_media(&self.catalog, &mut cache, &choice.url, &dest).await {
                Ok((path, true)) => {
                    downloaded += 1;
                    progress.emit(ScrapeEvent::MediaSaved { file: file_name });
                    media.insert(*slot, layout.relative(&path));
                }
                Ok((path, false)) => {
                    progress.emit(ScrapeEvent::MediaReused {
                        slot: *slot,
                        file: display_name(&path),
                    });
                    media.insert(*slot, layout.relative(&path));
                }
                Err(e) => {
                    log::warn!("Downloading {} failed: {}", choice.url, e);
                    progress.emit(ScrapeEvent::MediaFailed {
                        file: file_name,
                        error: e.to_string(),
                    });
                }
            }
        }
        (media, downloaded)
    }
}

/// Hash the ROM off the async runtime.
async fn identify(system_dir: &Path, rom_file: &Path) -> Result<RomIdentity, ScrapeError> {
    let system_dir = system_dir.to_path_buf();
    let rom_file = rom_file.to_path_buf();
    let identity = tokio::task::spawn_blocking(move || RomIdentity::from_file(&system_dir, &rom_file))
        .await
        .map_err(|e| ScrapeError::Io(std::io::Error::other(e)))??;
    Ok(identity)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
#[path = "tests/scrape_tests.rs"]
mod tests;
