use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use romscout_scraper::{
    CredentialSource, Credentials, GeminiGuesser, ScreenScraperClient, Settings, TitleGuesser,
    config_path, credential_sources, settings_path,
};

use crate::commands::{connect_catalog, load_settings, log_ok, title_guesser};
use crate::error::CliError;
use crate::spinner;

/// Filename used to exercise the title guesser in `config test`.
const GUESS_SAMPLE: &str = "sonic_2_(w)_[!].md";

fn mask_value(s: &str) -> String {
    let prefix: String = s.chars().take(2).collect();
    if s.chars().count() <= 2 {
        "****".to_string()
    } else {
        format!("{}****", prefix)
    }
}

fn file_status(path: &Path) -> String {
    let status = if path.exists() {
        "(exists)".if_supports_color(Stdout, |t| t.green()).to_string()
    } else {
        "(not found)".if_supports_color(Stdout, |t| t.dimmed()).to_string()
    };
    format!(
        "{} {}",
        path.display().if_supports_color(Stdout, |t| t.cyan()),
        status
    )
}

fn field(name: &str, value: impl std::fmt::Display) {
    log::info!(
        "  {} {}",
        format!("{}:", name).if_supports_color(Stdout, |t| t.cyan()),
        value,
    );
}

/// Show effective settings and credential sources.
pub(crate) fn run_config_show(config: Option<&Path>) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let settings_file = config
        .map(Path::to_path_buf)
        .unwrap_or_else(settings_path);

    log::info!("{}", "Settings".if_supports_color(Stdout, |t| t.bold()));
    crate::log_blank();
    field("settings file", file_status(&settings_file));
    show_settings(&settings);
    crate::log_blank();
    show_credentials();
    Ok(())
}

fn show_settings(settings: &Settings) {
    let paths = &settings.paths;
    field("roms_root", paths.roms_root.display());
    field("systems_file", file_status(&paths.systems_file));
    field("alt_names_file", file_status(&paths.alt_names_file));
    field("scratch_dir", paths.scratch_dir.display());
    field("progress_log", paths.progress_log.display());
    field(
        "language",
        settings.general.catalog_language().unwrap_or("(catalog default)"),
    );
    field(
        "merge",
        format!(
            "force={} force_metadata={} replace_stock_pictures={}",
            settings.general.force,
            settings.general.force_metadata,
            settings.general.replace_stock_pictures
        ),
    );
    let slots: Vec<&str> = settings
        .requested_slots()
        .iter()
        .map(|s| s.tag())
        .collect();
    field("media", slots.join(", "));
    field(
        "media folder",
        if settings.directories.save_media_in_rom_dir {
            format!("<rom dir>/{}", settings.directories.media_dir_name)
        } else {
            format!("<system dir>/{}", settings.directories.media_dir_name)
        },
    );
    match settings.ai.api_key() {
        Some(key) => field(
            "ai",
            format!("{} (key {})", settings.ai.model, mask_value(key)),
        ),
        None => field("ai", "off".if_supports_color(Stdout, |t| t.dimmed())),
    }
}

/// Show current credentials and their sources.
fn show_credentials() {
    log::info!(
        "{}",
        "ScreenScraper Credentials".if_supports_color(Stdout, |t| t.bold()),
    );
    crate::log_blank();

    match config_path() {
        Some(p) => field("credentials file", file_status(&p)),
        None => field(
            "credentials file",
            "could not determine path".if_supports_color(Stdout, |t| t.red()),
        ),
    }

    let sources = credential_sources(None);
    // Missing required fields make load() fail; show the sources anyway
    let creds = Credentials::load(None).ok();

    let rows: [(&str, &CredentialSource, Option<String>, bool); 5] = [
        (
            "dev_id",
            &sources.dev_id,
            creds.as_ref().map(|c| c.dev_id.clone()),
            false,
        ),
        (
            "dev_password",
            &sources.dev_password,
            creds.as_ref().map(|c| c.dev_password.clone()),
            true,
        ),
        (
            "soft_name",
            &sources.soft_name,
            creds.as_ref().map(|c| c.soft_name.clone()),
            false,
        ),
        (
            "user_id",
            &sources.user_id,
            creds.as_ref().and_then(|c| c.user_id.clone()),
            false,
        ),
        (
            "user_password",
            &sources.user_password,
            creds.as_ref().and_then(|c| c.user_password.clone()),
            true,
        ),
    ];

    for (name, source, value, secret) in rows {
        let source_str = format!("({})", source);
        let shown = match (source, value) {
            (CredentialSource::Missing, _) | (_, None) => {
                "not set".if_supports_color(Stdout, |t| t.yellow()).to_string()
            }
            (_, Some(v)) if secret => mask_value(&v),
            (_, Some(v)) => v,
        };
        field(
            name,
            format!(
                "{} {}",
                shown,
                source_str.if_supports_color(Stdout, |t| t.dimmed())
            ),
        );
    }
}

/// Print the settings and credentials file paths.
pub(crate) fn run_config_path(config: Option<&Path>) -> Result<(), CliError> {
    let settings_file = config
        .map(Path::to_path_buf)
        .unwrap_or_else(settings_path);
    println!("{}", settings_file.display());
    let creds = config_path()
        .ok_or_else(|| CliError::config("could not determine the config directory"))?;
    println!("{}", creds.display());
    Ok(())
}

/// Check the catalog credentials, then the title guesser if one is set up.
pub(crate) fn run_config_test(config: Option<&Path>, quiet: bool) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let client = connect_catalog(&settings)?;
    let guesser = title_guesser(&settings)?;

    let rt = crate::runtime()?;
    rt.block_on(check_services(client, guesser, quiet))
}

async fn check_services(
    client: ScreenScraperClient,
    guesser: Option<GeminiGuesser>,
    quiet: bool,
) -> Result<(), CliError> {
    let pb = spinner::spinner("Connecting to ScreenScraper...", quiet);
    let info = client.user_info().await;
    pb.finish_and_clear();
    let info = info?;
    log_ok(format!(
        "Connected to ScreenScraper (requests today: {}/{}, max threads: {})",
        info.requests_today(),
        info.max_requests_per_day(),
        info.max_threads(),
    ));

    let Some(guesser) = guesser else {
        log::info!(
            "  {}",
            "Title guessing is off (no [ai] api_key)".if_supports_color(Stdout, |t| t.dimmed()),
        );
        return Ok(());
    };
    let pb = spinner::spinner("Asking the title guesser...", quiet);
    let titles = guesser.guess_titles(GUESS_SAMPLE).await;
    pb.finish_and_clear();
    let titles = titles?;
    if titles.is_empty() {
        log::warn!(
            "{} Title guesser answered with no titles",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
        );
    } else {
        log_ok(format!(
            "Title guesser works ({} -> {})",
            GUESS_SAMPLE,
            titles.join(" | ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_secrets() {
        assert_eq!(mask_value("hunter2"), "hu****");
        assert_eq!(mask_value("ab"), "****");
        assert_eq!(mask_value("élan"), "él****");
    }

    #[test]
    fn show_accepts_an_empty_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("settings.toml");
        std::fs::write(&config, "").unwrap();
        run_config_show(Some(&config)).unwrap();
    }

    #[test]
    fn invalid_settings_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("settings.toml");
        std::fs::write(&config, "[directories]\nmedia_dir_name = \"../x\"\n").unwrap();
        assert!(matches!(
            run_config_show(Some(&config)),
            Err(CliError::Scrape(_))
        ));
    }
}
