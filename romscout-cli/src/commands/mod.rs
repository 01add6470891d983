pub(crate) mod config;
pub(crate) mod list;
pub(crate) mod scrape;
pub(crate) mod session;

use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use romscout_scraper::{
    AltNameStore, Credentials, GeminiGuesser, ScreenScraperClient, Scraper, Settings,
    SystemMapping,
};

use crate::error::CliError;

/// The scraper as the CLI runs it: the live catalog plus the optional
/// Gemini guesser.
pub(crate) type LiveScraper = Scraper<ScreenScraperClient, GeminiGuesser>;

pub(crate) fn load_settings(config: Option<&Path>) -> Result<Settings, CliError> {
    let settings = Settings::load(config)?;
    log::debug!("ROM root: {}", settings.paths.roms_root.display());
    Ok(settings)
}

/// Build the catalog client from stored credentials.
pub(crate) fn connect_catalog(settings: &Settings) -> Result<ScreenScraperClient, CliError> {
    let creds = match Credentials::load(None) {
        Ok(creds) => creds,
        Err(e) => {
            log::error!("Set credentials via environment variables:");
            log::error!("  SCREENSCRAPER_DEVID, SCREENSCRAPER_DEVPASSWORD");
            log::error!("  SCREENSCRAPER_SSID, SCREENSCRAPER_SSPASSWORD (optional)");
            log::error!("Or add a [screenscraper] section to the credentials file.");
            return Err(e.into());
        }
    };
    Ok(ScreenScraperClient::new(
        creds,
        settings.general.catalog_language(),
    )?)
}

/// The Gemini guesser, when an API key is configured.
pub(crate) fn title_guesser(settings: &Settings) -> Result<Option<GeminiGuesser>, CliError> {
    match settings.ai.api_key() {
        Some(key) => Ok(Some(GeminiGuesser::new(key, settings.ai.model.as_str())?)),
        None => Ok(None),
    }
}

/// Assemble the full scraper: catalog, guesser, system ids and alt names.
pub(crate) fn build_scraper(settings: Settings) -> Result<LiveScraper, CliError> {
    let catalog = connect_catalog(&settings)?;
    let guesser = title_guesser(&settings)?;
    let systems = SystemMapping::load(&settings.paths.systems_file)?;
    let alt_names = AltNameStore::load(&settings.paths.alt_names_file)?;
    log::debug!(
        "{} system id(s), {} alternate name(s), guesser {}",
        systems.len(),
        alt_names.entries().len(),
        if guesser.is_some() { "on" } else { "off" },
    );
    Ok(Scraper::new(catalog, guesser, settings, systems, alt_names))
}

/// Fail unless `system` is a folder under the ROM root.
pub(crate) fn require_system_dir(settings: &Settings, system: &str) -> Result<(), CliError> {
    if system.is_empty() || system.contains(['/', '\\']) || system == ".." {
        return Err(CliError::unknown_system(system));
    }
    let dir = settings.system_dir(system);
    if !dir.is_dir() {
        return Err(CliError::unknown_system(format!(
            "{} (no folder at {})",
            system,
            dir.display()
        )));
    }
    Ok(())
}

/// `✔ message` in green.
pub(crate) fn log_ok(msg: impl std::fmt::Display) {
    log::info!(
        "{} {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        msg
    );
}
