use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use romscout_frontend::{GameList, InventoryEntry, MediaSlot, inventory};
use romscout_scraper::{ScrapeError, Settings};

use crate::commands::{load_settings, require_system_dir};
use crate::error::CliError;

/// List the games recorded for one system and the state of their media.
pub(crate) fn run_list(
    config: Option<&Path>,
    system: &str,
    missing: bool,
    json: bool,
) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let entries = system_inventory(&settings, system, missing)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).map_err(std::io::Error::other)?
        );
        return Ok(());
    }

    let wanted = settings.requested_slots();
    log::info!(
        "{} ({} game(s){})",
        system.if_supports_color(Stdout, |t| t.bold()),
        entries.len(),
        if missing { " with missing media" } else { "" },
    );
    crate::log_blank();
    for entry in &entries {
        print_entry(entry, &wanted);
    }
    Ok(())
}

/// Inventory of `system`, optionally only entries missing a requested slot.
fn system_inventory(
    settings: &Settings,
    system: &str,
    missing: bool,
) -> Result<Vec<InventoryEntry>, CliError> {
    require_system_dir(settings, system)?;
    let list = GameList::load(&settings.gamelist_path(system)).map_err(ScrapeError::from)?;
    // Stored paths resolve against the system folder for every ROM
    let layout = settings.media_layout(system, "");
    let mut entries = inventory(&list, &layout);
    if missing {
        let wanted = settings.requested_slots();
        entries.retain(|entry| !entry.missing(&wanted).is_empty());
    }
    Ok(entries)
}

fn print_entry(entry: &InventoryEntry, wanted: &[MediaSlot]) {
    let slots: Vec<String> = entry
        .slots
        .iter()
        .filter(|s| wanted.contains(&s.slot))
        .map(|s| {
            if s.exists {
                s.slot.tag().if_supports_color(Stdout, |t| t.green()).to_string()
            } else if s.stored.is_some() {
                format!("{} (broken)", s.slot.tag())
                    .if_supports_color(Stdout, |t| t.red())
                    .to_string()
            } else {
                s.slot.tag().if_supports_color(Stdout, |t| t.dimmed()).to_string()
            }
        })
        .collect();
    log::info!(
        "  {} {}",
        entry.name.if_supports_color(Stdout, |t| t.bold()),
        entry.rom_path.if_supports_color(Stdout, |t| t.dimmed()),
    );
    log::info!("    {}", slots.join(" "));
}
