//! Typed application settings (`~/.config/romscout/settings.toml`).
//!
//! Every recognized option is listed here with its default. Unknown keys
//! are ignored and missing sections fall back to defaults, so an empty
//! file is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use romscout_frontend::{GAMELIST_FILE, MediaLayout, MediaSlot, MergeMode};

use crate::error::ScrapeError;
use crate::media::{MediaMapping, MediaSelector};

/// Canonical path to the settings file.
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.toml")
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("romscout")
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("romscout")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub general: GeneralSettings,
    pub directories: DirectorySettings,
    pub media: MediaSettings,
    pub selection: MediaSelector,
    pub ai: AiSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Library root; each system is a subfolder
    pub roms_root: PathBuf,
    /// JSON object of system folder to catalog system id
    pub systems_file: PathBuf,
    /// Alternate-name table
    pub alt_names_file: PathBuf,
    /// Root for diagnose session folders
    pub scratch_dir: PathBuf,
    /// Progress stream of the last batch job
    pub progress_log: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        let data = data_dir();
        Self {
            roms_root: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("roms"),
            systems_file: config_dir().join("systems.json"),
            alt_names_file: config_dir().join("alt_rom_names.csv"),
            scratch_dir: data.join("sessions"),
            progress_log: data.join("scrape.log"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Catalog language code; `none` sends no language
    pub language: String,
    pub force: bool,
    pub force_metadata: bool,
    pub replace_stock_pictures: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            force: false,
            force_metadata: false,
            replace_stock_pictures: false,
        }
    }
}

impl GeneralSettings {
    /// Language to send to the catalog, if any.
    pub fn catalog_language(&self) -> Option<&str> {
        let lang = self.language.trim();
        (!lang.is_empty() && !lang.eq_ignore_ascii_case("none")).then_some(lang)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySettings {
    /// Put media next to the ROM instead of under the system folder
    pub save_media_in_rom_dir: bool,
    pub media_dir_name: String,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            save_media_in_rom_dir: false,
            media_dir_name: "downloaded_images".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    pub scrape_image: bool,
    pub scrape_video: bool,
    pub scrape_marquee: bool,
    pub scrape_thumbnail: bool,
    pub image_source: String,
    pub thumbnail_source: String,
    pub video_sources: Vec<String>,
    pub marquee_sources: Vec<String>,
    /// Extensions scanned when a whole system is scraped
    pub rom_extensions: Vec<String>,
}

impl Default for MediaSettings {
    fn default() -> Self {
        let mapping = MediaMapping::default();
        Self {
            scrape_image: true,
            scrape_video: true,
            scrape_marquee: true,
            scrape_thumbnail: true,
            image_source: mapping.image_source,
            thumbnail_source: mapping.thumbnail_source,
            video_sources: mapping.video_sources,
            marquee_sources: mapping.marquee_sources,
            rom_extensions: ["zip", "7z", "sfc", "smc", "bin"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// Gemini API key; title guessing is off without one
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
        }
    }
}

impl AiSettings {
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

impl Settings {
    /// Load settings from `path` (or the default location). A missing file
    /// yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ScrapeError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(settings_path);
        if !path.exists() {
            log::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)?;
        let settings = Self::from_toml(&text)
            .map_err(|e| ScrapeError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(settings)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ScrapeError> {
        let settings: Settings =
            toml::from_str(text).map_err(|e| ScrapeError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_toml_string(&self) -> Result<String, ScrapeError> {
        toml::to_string_pretty(self).map_err(|e| ScrapeError::Config(e.to_string()))
    }

    fn validate(&self) -> Result<(), ScrapeError> {
        let dir_name = self.directories.media_dir_name.trim();
        if dir_name.is_empty() || dir_name.contains(['/', '\\']) || dir_name == ".." {
            return Err(ScrapeError::Config(format!(
                "directories.media_dir_name must be a plain folder name, got '{}'",
                self.directories.media_dir_name
            )));
        }
        if self.media.image_source.trim().is_empty() || self.media.thumbnail_source.trim().is_empty()
        {
            return Err(ScrapeError::Config(
                "media.image_source and media.thumbnail_source must not be empty".to_string(),
            ));
        }
        if self.media.rom_extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(ScrapeError::Config(
                "media.rom_extensions must list at least one extension".to_string(),
            ));
        }
        Ok(())
    }

    /// Slots enabled by the `scrape_*` toggles.
    pub fn requested_slots(&self) -> Vec<MediaSlot> {
        MediaSlot::ALL
            .into_iter()
            .filter(|slot| match slot {
                MediaSlot::Image => self.media.scrape_image,
                MediaSlot::Video => self.media.scrape_video,
                MediaSlot::Marquee => self.media.scrape_marquee,
                MediaSlot::Thumbnail => self.media.scrape_thumbnail,
            })
            .collect()
    }

    pub fn media_mapping(&self) -> MediaMapping {
        MediaMapping {
            image_source: self.media.image_source.clone(),
            thumbnail_source: self.media.thumbnail_source.clone(),
            video_sources: self.media.video_sources.clone(),
            marquee_sources: self.media.marquee_sources.clone(),
        }
    }

    pub fn merge_mode(&self) -> MergeMode {
        MergeMode {
            force: self.general.force,
            force_metadata: self.general.force_metadata,
            replace_stock: self.general.replace_stock_pictures,
        }
    }

    pub fn system_dir(&self, system: &str) -> PathBuf {
        self.paths.roms_root.join(system)
    }

    pub fn gamelist_path(&self, system: &str) -> PathBuf {
        self.system_dir(system).join(GAMELIST_FILE)
    }

    /// Media layout for a ROM. `rom_path` is library-relative (`./sub/a.zip`).
    pub fn media_layout(&self, system: &str, rom_path: &str) -> MediaLayout {
        let system_dir = self.system_dir(system);
        let media_parent = if self.directories.save_media_in_rom_dir {
            let rom_file = system_dir.join(rom_path.trim_start_matches("./"));
            rom_file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| system_dir.clone())
        } else {
            system_dir.clone()
        };
        MediaLayout::new(
            system_dir,
            media_parent.join(&self.directories.media_dir_name),
        )
    }

    /// Directory names skipped while scanning a system folder for ROMs.
    pub fn scan_skip_dirs(&self) -> Vec<&str> {
        vec![self.directories.media_dir_name.as_str()]
    }
}
