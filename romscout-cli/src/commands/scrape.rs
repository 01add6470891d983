use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::ProgressBar;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use romscout_frontend::MergeMode;
use romscout_scraper::{JobController, JobItem, JobSummary, ScrapeEvent, Settings};

use crate::commands::{LiveScraper, build_scraper, load_settings, log_ok, require_system_dir};
use crate::error::CliError;
use crate::spinner;

/// `--force*` flags; each one can only switch a setting on.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ModeFlags {
    pub force: bool,
    pub force_metadata: bool,
    pub replace_stock: bool,
}

impl ModeFlags {
    fn apply(self, mut mode: MergeMode) -> MergeMode {
        mode.force |= self.force;
        mode.force_metadata |= self.force_metadata;
        mode.replace_stock |= self.replace_stock;
        mode
    }
}

/// Run the scrape command.
pub(crate) fn run_scrape(
    config: Option<&Path>,
    system: &str,
    rom: Option<PathBuf>,
    flags: ModeFlags,
    quiet: bool,
) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    require_system_dir(&settings, system)?;
    let mode = flags.apply(settings.merge_mode());
    let progress_log = settings.paths.progress_log.clone();

    let single = rom
        .as_deref()
        .map(|rom| rom_item(&settings, system, rom))
        .transpose()?;
    let scraper = Arc::new(build_scraper(settings)?);
    let items = match single {
        Some(item) => vec![item],
        None => scraper
            .scan_system(system)?
            .into_iter()
            .map(|rom| JobItem {
                system: system.to_string(),
                rom,
            })
            .collect(),
    };

    if items.is_empty() {
        log::warn!(
            "{} No ROM files found for \"{}\"",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            system,
        );
        return Ok(());
    }

    log::info!(
        "Scraping {} {}",
        system.if_supports_color(Stdout, |t| t.bold()),
        format!("({} ROMs)", items.len()).if_supports_color(Stdout, |t| t.dimmed()),
    );
    if mode.force || mode.force_metadata || mode.replace_stock {
        log::info!(
            "{}",
            format!(
                "force: {}, force metadata: {}, replace stock pictures: {}",
                mode.force, mode.force_metadata, mode.replace_stock
            )
            .if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    log::info!(
        "Progress log: {}",
        progress_log.display().if_supports_color(Stdout, |t| t.dimmed()),
    );
    crate::log_blank();

    let rt = crate::runtime()?;
    rt.block_on(run_job(scraper, items, mode, progress_log, quiet))
}

async fn run_job(
    scraper: Arc<LiveScraper>,
    items: Vec<JobItem>,
    mode: MergeMode,
    progress_log: PathBuf,
    quiet: bool,
) -> Result<(), CliError> {
    let controller = JobController::new(Some(progress_log));
    let total = items.len();
    let mut handle = controller.start(scraper, items, mode)?;

    let on_interrupt = controller.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let bar = spinner::job_bar(total, quiet);
    let mut interrupted = false;
    while let Some(event) = handle.events.recv().await {
        if event == ScrapeEvent::Interrupted {
            interrupted = true;
        }
        show_event(&bar, &event);
    }
    bar.finish_and_clear();

    let summary = handle.wait().await?;
    print_summary(&summary);
    if interrupted {
        log::warn!(
            "{} Interrupted before all ROMs were processed",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
        );
    }
    Ok(())
}

/// Render one progress event above the bar.
fn show_event(bar: &ProgressBar, event: &ScrapeEvent) {
    match event {
        ScrapeEvent::JobStarted { .. } | ScrapeEvent::Summary(_) => {}
        ScrapeEvent::Complete | ScrapeEvent::Interrupted => {}
        ScrapeEvent::Progress { index, .. } => {
            bar.set_position(index.saturating_sub(1) as u64);
        }
        ScrapeEvent::Processing { stem } => {
            bar.set_message(stem.clone());
            bar.suspend(|| log::info!("{}", event.if_supports_color(Stdout, |t| t.bold())));
        }
        ScrapeEvent::Matched { .. }
        | ScrapeEvent::MediaSaved { .. }
        | ScrapeEvent::Updated { .. }
        | ScrapeEvent::Linked { .. }
        | ScrapeEvent::AltNameSaved { .. } => {
            bar.suspend(|| log::info!("  {}", event.if_supports_color(Stdout, |t| t.green())));
        }
        ScrapeEvent::Skipped { .. }
        | ScrapeEvent::MediaExists { .. }
        | ScrapeEvent::MediaReused { .. }
        | ScrapeEvent::GuessTip => {
            bar.suspend(|| log::info!("  {}", event.if_supports_color(Stdout, |t| t.dimmed())));
        }
        ScrapeEvent::StageFailed { .. }
        | ScrapeEvent::MediaFailed { .. }
        | ScrapeEvent::AltNameSaveFailed { .. }
        | ScrapeEvent::NoMatch { .. } => {
            bar.suspend(|| log::warn!("  {}", event.if_supports_color(Stdout, |t| t.yellow())));
        }
        ScrapeEvent::ItemFailed { .. } => {
            bar.suspend(|| log::warn!("  {}", event.if_supports_color(Stdout, |t| t.red())));
        }
        _ => bar.suspend(|| log::info!("  {}", event)),
    }
}

fn print_summary(summary: &JobSummary) {
    crate::log_blank();
    if summary.scraped > 0 {
        log_ok(format!(
            "{} games scraped (hash: {}, name: {}, alt-name: {}, ai-guess: {})",
            summary.scraped,
            summary.by_hash,
            summary.by_name,
            summary.by_alt_name,
            summary.by_ai_guess,
        ));
    }
    if summary.media_downloaded > 0 {
        log_ok(format!(
            "{} media files downloaded",
            summary.media_downloaded
        ));
    }
    if summary.linked > 0 {
        log_ok(format!("{} entries linked to local media", summary.linked));
    }
    if summary.skipped > 0 {
        log::info!(
            "  {}",
            format!("{} already complete", summary.skipped).if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    if summary.no_match > 0 {
        log::warn!(
            "{} {} unidentified",
            "?".if_supports_color(Stdout, |t| t.yellow()),
            summary.no_match,
        );
    }
    if summary.failed > 0 {
        log::warn!(
            "{} {} errors",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            summary.failed,
        );
    }
}

/// Resolve `--rom` to a path under the system folder. Accepts a path
/// relative to the system folder or any path that exists inside it.
fn rom_item(settings: &Settings, system: &str, rom: &Path) -> Result<JobItem, CliError> {
    let system_dir = settings.system_dir(system);
    let candidate = if rom.exists() {
        rom.to_path_buf()
    } else {
        system_dir.join(rom)
    };
    if !candidate.is_file() {
        return Err(CliError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("ROM not found: {}", rom.display()),
        )));
    }

    let abs_dir = std::path::absolute(&system_dir)?;
    let abs_rom = std::path::absolute(&candidate)?;
    let relative = abs_rom.strip_prefix(&abs_dir).map_err(|_| {
        CliError::config(format!(
            "{} is not inside {}",
            rom.display(),
            system_dir.display()
        ))
    })?;
    Ok(JobItem {
        system: system.to_string(),
        rom: system_dir.join(relative),
    })
}
