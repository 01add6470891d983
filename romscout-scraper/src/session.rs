//! Human-review workflow: stage every candidate file for a name, then
//! commit the ones a person picked.
//!
//! Each diagnose call owns a scratch folder `<scratch_dir>/<uuid>/`. The
//! folder is removed by `confirm` (whatever its outcome), by
//! [`cleanup_session`], or by [`sweep_sessions`].

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

use romscout_core::RomIdentity;
use romscout_frontend::{GameList, GameMetadata, MediaSlot, MergeMode, RecordUpdate, merge};

use crate::alt_names::AltNameMapping;
use crate::catalog::{Catalog, CatalogQuery};
use crate::error::ScrapeError;
use crate::guess::TitleGuesser;
use crate::media::media_extension;
use crate::scrape::Scraper;

/// A downloaded candidate waiting for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedFile {
    pub url: String,
    /// File name inside the session folder
    pub temp_name: String,
    /// Slots the catalog kind maps to
    pub slots: Vec<MediaSlot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnoseReport {
    pub session_id: String,
    pub session_dir: PathBuf,
    /// Catalog name of the match, if there was one
    pub game_name: Option<String>,
    pub files: Vec<StagedFile>,
}

/// A person's verdict on a diagnose session.
#[derive(Debug, Clone)]
pub struct ConfirmRequest {
    pub session_id: String,
    /// System folder the ROM lives in
    pub system: String,
    /// Library-relative ROM path (`./Sonic.zip`)
    pub rom_path: String,
    /// Name to search the catalog under from now on
    pub new_name: String,
    /// System to search under, when different from `system`
    pub new_system: Option<String>,
    /// Chosen staged files and the slot each should fill
    pub files: Vec<(String, MediaSlot)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmOutcome {
    /// Store-relative path written for each slot
    pub media: BTreeMap<MediaSlot, String>,
    /// Metadata refreshed from the catalog under the confirmed name
    pub metadata: Option<GameMetadata>,
    pub alt_name_updated: bool,
}

/// Diagnose and confirm on top of a [`Scraper`]'s collaborators.
pub struct SessionStager<'a, C, G> {
    scraper: &'a Scraper<C, G>,
}

impl<'a, C: Catalog, G: TitleGuesser> SessionStager<'a, C, G> {
    pub fn new(scraper: &'a Scraper<C, G>) -> Self {
        Self { scraper }
    }

    fn scratch_root(&self) -> &Path {
        &self.scraper.settings().paths.scratch_dir
    }

    /// Look `rom_name` up in `system` and download every distinct mapped
    /// media URL into a fresh session folder.
    ///
    /// Existing gamelist entries are not consulted. A name the catalog does
    /// not know yields a session with no files.
    pub async fn diagnose(
        &self,
        rom_name: &str,
        system: &str,
    ) -> Result<DiagnoseReport, ScrapeError> {
        let system_id = self.scraper.systems().system_id(system).ok_or_else(|| {
            ScrapeError::Config(format!("system '{}' has no catalog id", system))
        })?;

        let session_id = Uuid::new_v4().to_string();
        let session_dir = self.scratch_root().join(&session_id);
        std::fs::create_dir_all(&session_dir)?;
        log::info!("Diagnose '{}' on {} (session {})", rom_name, system, session_id);

        let query = CatalogQuery::name(rom_name, system_id);
        let game = match self.scraper.catalog().lookup(&query).await {
            Ok(game) => game,
            Err(e) => {
                remove_session_dir(&session_dir);
                return Err(e);
            }
        };

        let mut report = DiagnoseReport {
            session_id,
            session_dir,
            game_name: None,
            files: Vec::new(),
        };
        let Some(game) = game else {
            log::info!("No catalog entry for '{}'", rom_name);
            return Ok(report);
        };
        report.game_name = game.display_name().map(str::to_string);

        let mapping = self.scraper.settings().media_mapping();
        let mut seen = HashSet::new();
        for candidate in &game.medias {
            if candidate.url.is_empty() || !seen.insert(candidate.url.as_str()) {
                continue;
            }
            let slots = mapping.slots_for(&candidate.kind);
            let Some(first) = slots.first() else {
                continue;
            };
            let temp_name = format!("{}.{}", Uuid::new_v4(), media_extension(candidate, *first));
            match self.scraper.catalog().download(&candidate.url).await {
                Ok(bytes) => {
                    if let Err(e) = std::fs::write(report.session_dir.join(&temp_name), bytes) {
                        remove_session_dir(&report.session_dir);
                        return Err(e.into());
                    }
                    report.files.push(StagedFile {
                        url: candidate.url.clone(),
                        temp_name,
                        slots,
                    });
                }
                Err(e) => log::warn!("Could not stage {}: {}", candidate.url, e),
            }
        }
        Ok(report)
    }

    /// Commit chosen files of a session into the ROM's gamelist entry.
    ///
    /// The session folder is removed afterwards on every path past id
    /// validation. A failure after files were moved is reported as
    /// [`ScrapeError::PartialCommit`]; the moved files stay in place.
    pub async fn confirm(&self, request: &ConfirmRequest) -> Result<ConfirmOutcome, ScrapeError> {
        let dir = session_dir(self.scratch_root(), &request.session_id)?;
        if !dir.is_dir() {
            return Err(ScrapeError::InvalidSession(format!(
                "no staged files for session {}",
                request.session_id
            )));
        }
        let result = self.commit(request, &dir).await;
        remove_session_dir(&dir);
        result
    }

    async fn commit(
        &self,
        request: &ConfirmRequest,
        dir: &Path,
    ) -> Result<ConfirmOutcome, ScrapeError> {
        if let Some((bad, _)) = request.files.iter().find(|(name, _)| !is_plain_file_name(name)) {
            return Err(ScrapeError::InvalidSession(format!(
                "'{}' is not a staged file name",
                bad
            )));
        }

        let settings = self.scraper.settings();
        let rom = RomIdentity::from_library_path(&request.rom_path);
        let layout = settings.media_layout(&request.system, &rom.rom_path);

        // One move per staged file, however many slots it fills
        let mut grouped: Vec<(&str, Vec<MediaSlot>)> = Vec::new();
        for (name, slot) in &request.files {
            match grouped.iter_mut().find(|(n, _)| n == name) {
                Some((_, slots)) if !slots.contains(slot) => slots.push(*slot),
                Some(_) => {}
                None => grouped.push((name.as_str(), vec![*slot])),
            }
        }

        let mut media = BTreeMap::new();
        let mut moved = 0;
        for (name, slots) in &grouped {
            let src = dir.join(name);
            if !src.is_file() {
                log::warn!("Staged file {} is gone, skipping", name);
                continue;
            }
            let primary = slots[0];
            let extension = Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or(primary.default_extension());
            let dest = layout.media_file(&rom.stem, primary, extension);
            move_file(&src, &dest).map_err(|e| partial(moved, e.into()))?;
            moved += 1;

            let stored = layout.relative(&dest);
            for slot in slots {
                media.insert(*slot, stored.clone());
            }
        }

        let search_system = request.new_system.as_deref().unwrap_or(&request.system);
        let alt_name_updated = request.new_name != rom.stem || search_system != request.system;
        if alt_name_updated {
            let mapping = AltNameMapping::new(
                &rom.stem,
                &request.new_name,
                Some(&request.system),
                Some(search_system),
            );
            self.scraper
                .alt_names()
                .lock()
                .await
                .supersede(mapping)
                .map_err(|e| partial(moved, e))?;
        }

        let metadata = self.requery(&request.new_name, search_system).await;

        let gamelist_path = settings.gamelist_path(&request.system);
        let update = RecordUpdate {
            metadata: metadata.clone(),
            media: media.clone(),
        };
        let mut list = GameList::load(&gamelist_path).map_err(|e| partial(moved, e.into()))?;
        let record = merge(
            list.find(&rom.rom_path),
            &rom.rom_path,
            &update,
            MergeMode::confirmed(),
        );
        list.upsert(record);
        list.save(&gamelist_path)
            .map_err(|e| partial(moved, e.into()))?;

        Ok(ConfirmOutcome {
            media,
            metadata,
            alt_name_updated,
        })
    }

    /// Fresh metadata under the confirmed name. Any failure leaves the
    /// commit with media paths only.
    async fn requery(&self, name: &str, system: &str) -> Option<GameMetadata> {
        let Some(system_id) = self.scraper.systems().system_id(system) else {
            log::warn!("System '{}' has no catalog id; only media paths will be updated", system);
            return None;
        };
        match self
            .scraper
            .catalog()
            .lookup(&CatalogQuery::name(name, system_id))
            .await
        {
            Ok(Some(game)) => Some(
                game.to_metadata(self.scraper.settings().general.catalog_language(), name),
            ),
            Ok(None) => {
                log::info!("Could not fetch metadata for '{}'; only media paths will be updated", name);
                None
            }
            Err(e) => {
                log::warn!("Metadata lookup for '{}' failed: {}", name, e);
                None
            }
        }
    }
}

fn partial(moved: usize, err: ScrapeError) -> ScrapeError {
    if moved == 0 {
        err
    } else {
        ScrapeError::PartialCommit {
            moved,
            message: err.to_string(),
        }
    }
}

/// Folder of a session, rejecting anything that is not a UUID.
pub fn session_dir(scratch_root: &Path, session_id: &str) -> Result<PathBuf, ScrapeError> {
    let id = Uuid::parse_str(session_id.trim())
        .map_err(|_| ScrapeError::InvalidSession(format!("'{}' is not a session id", session_id)))?;
    Ok(scratch_root.join(id.to_string()))
}

/// Remove one session folder. Returns `false` if it did not exist.
pub fn cleanup_session(scratch_root: &Path, session_id: &str) -> Result<bool, ScrapeError> {
    let dir = session_dir(scratch_root, session_id)?;
    if !dir.is_dir() {
        return Ok(false);
    }
    std::fs::remove_dir_all(&dir)?;
    log::info!("Cleaned up session {}", session_id);
    Ok(true)
}

/// Remove every leftover session folder. Returns how many were removed.
pub fn sweep_sessions(scratch_root: &Path) -> Result<usize, ScrapeError> {
    let entries = match std::fs::read_dir(scratch_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };
    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_session = entry
            .file_name()
            .to_str()
            .is_some_and(|name| Uuid::parse_str(name).is_ok());
        if !is_session || !path.is_dir() {
            continue;
        }
        match std::fs::remove_dir_all(&path) {
            Ok(()) => removed += 1,
            Err(e) => log::warn!("Could not remove old session {}: {}", path.display(), e),
        }
    }
    Ok(removed)
}

fn remove_session_dir(dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir) {
        if e.kind() != io::ErrorKind::NotFound {
            log::warn!("Could not remove session folder {}: {}", dir.display(), e);
        }
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}

/// Rename, falling back to copy and delete across filesystems.
fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if std::fs::rename(src, dest).is_ok() {
        return Ok(());
    }
    std::fs::copy(src, dest)?;
    std::fs::remove_file(src)
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
