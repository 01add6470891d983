use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use romscout_scraper::{
    ConfirmOutcome, ConfirmRequest, DiagnoseReport, SessionStager, cleanup_session, sweep_sessions,
};

use crate::commands::{build_scraper, load_settings, log_ok, require_system_dir};
use crate::error::CliError;
use crate::spinner;

/// Stage every candidate file for `rom_name` and print the session.
pub(crate) fn run_diagnose(
    config: Option<&Path>,
    system: &str,
    rom_name: &str,
    json: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    require_system_dir(&settings, system)?;
    let scraper = build_scraper(settings)?;

    let rt = crate::runtime()?;
    let report = rt.block_on(async {
        let pb = spinner::spinner(format!("Looking up \"{}\"...", rom_name), quiet || json);
        let report = SessionStager::new(&scraper).diagnose(rom_name, system).await;
        pb.finish_and_clear();
        report
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report).map_err(std::io::Error::other)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &DiagnoseReport) {
    match &report.game_name {
        Some(name) => log_ok(format!(
            "Matched \"{}\"",
            name.if_supports_color(Stdout, |t| t.green())
        )),
        None => log::warn!(
            "{} No catalog match",
            "?".if_supports_color(Stdout, |t| t.yellow()),
        ),
    }
    log::info!(
        "  {} {}",
        "Session:".if_supports_color(Stdout, |t| t.cyan()),
        report.session_id.if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!(
        "  {} {}",
        "Folder: ".if_supports_color(Stdout, |t| t.cyan()),
        report.session_dir.display(),
    );
    crate::log_blank();

    if report.files.is_empty() {
        log::info!(
            "  {}",
            "No files staged".if_supports_color(Stdout, |t| t.dimmed())
        );
        return;
    }
    for file in &report.files {
        let slots: Vec<&str> = file.slots.iter().map(|s| s.tag()).collect();
        log::info!(
            "  {} {} {}",
            file.temp_name.if_supports_color(Stdout, |t| t.bold()),
            format!("[{}]", slots.join(", ")).if_supports_color(Stdout, |t| t.cyan()),
            file.url.if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    crate::log_blank();
    log::info!(
        "{}",
        format!(
            "Commit with: romscout confirm --session {} --system <system> --rom-path <./rom> --name <name> --file <temp>=<slot>",
            report.session_id
        )
        .if_supports_color(Stdout, |t| t.dimmed()),
    );
}

/// Commit the chosen files of a session.
pub(crate) fn run_confirm(
    config: Option<&Path>,
    request: ConfirmRequest,
    quiet: bool,
) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    require_system_dir(&settings, &request.system)?;
    let scraper = build_scraper(settings)?;

    let rt = crate::runtime()?;
    let outcome = rt.block_on(async {
        let pb = spinner::spinner("Committing session...", quiet);
        let outcome = SessionStager::new(&scraper).confirm(&request).await;
        pb.finish_and_clear();
        outcome
    })?;

    print_outcome(&request, &outcome);
    Ok(())
}

fn print_outcome(request: &ConfirmRequest, outcome: &ConfirmOutcome) {
    log_ok(format!(
        "Updated {} in {}",
        request.rom_path.if_supports_color(Stdout, |t| t.bold()),
        request.system,
    ));
    for (slot, path) in &outcome.media {
        log::info!(
            "  {} {}",
            format!("{}:", slot).if_supports_color(Stdout, |t| t.cyan()),
            path,
        );
    }
    match &outcome.metadata {
        Some(meta) => log::info!(
            "  {} {}",
            "name:".if_supports_color(Stdout, |t| t.cyan()),
            meta.name,
        ),
        None => log::warn!(
            "  {} No catalog entry for \"{}\"; only media paths were written",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            request.new_name,
        ),
    }
    if outcome.alt_name_updated {
        log::info!(
            "  {}",
            "Alternate name recorded".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
}

/// Remove one session, or every leftover session with `all`.
pub(crate) fn run_cleanup(
    config: Option<&Path>,
    session: Option<&str>,
    all: bool,
) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let root = &settings.paths.scratch_dir;

    if all {
        let removed = sweep_sessions(root)?;
        log_ok(format!("Removed {} session(s)", removed));
        return Ok(());
    }

    let id = session.ok_or_else(|| CliError::config("a session id or --all is required"))?;
    if cleanup_session(root, id)? {
        log_ok(format!("Removed session {}", id));
    } else {
        log::warn!(
            "{} No session {} to remove",
            "?".if_supports_color(Stdout, |t| t.yellow()),
            id,
        );
    }
    Ok(())
}
