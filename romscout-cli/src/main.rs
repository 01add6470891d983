//! romscout CLI
//!
//! Command-line interface for scraping ROM metadata and media into
//! per-system gamelist.xml files.

mod cli_types;
mod commands;
mod error;
mod spinner;

use std::io::Write;

use clap::Parser;
use log::LevelFilter;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use cli_types::{Cli, Commands, ConfigAction};
use error::CliError;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let config = cli.config.as_deref();
    let quiet = cli.quiet;
    let result = match cli.command {
        Commands::Scrape {
            system,
            rom,
            force,
            force_metadata,
            replace_stock,
        } => commands::scrape::run_scrape(
            config,
            &system,
            rom,
            commands::scrape::ModeFlags {
                force,
                force_metadata,
                replace_stock,
            },
            quiet,
        ),
        Commands::List {
            system,
            missing,
            json,
        } => commands::list::run_list(config, &system, missing, json),
        Commands::Diagnose {
            system,
            rom_name,
            json,
        } => commands::session::run_diagnose(config, &system, &rom_name, json, quiet),
        Commands::Confirm {
            session,
            system,
            rom_path,
            name,
            new_system,
            files,
        } => commands::session::run_confirm(
            config,
            romscout_scraper::ConfirmRequest {
                session_id: session,
                system,
                rom_path,
                new_name: name,
                new_system,
                files,
            },
            quiet,
        ),
        Commands::Cleanup { session, all } => {
            commands::session::run_cleanup(config, session.as_deref(), all)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::run_config_show(config),
            ConfigAction::Path => commands::config::run_config_path(config),
            ConfigAction::Test => commands::config::run_config_test(config, quiet),
        },
    };

    if let Err(e) = result {
        log::error!(
            "{} {}",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            e
        );
        std::process::exit(1);
    }
}

/// Install the logger. Plain messages on stdout by default; `--verbose`
/// adds timestamps, levels and debug output. `RUST_LOG` still overrides
/// the level.
fn init_logging(quiet: bool, verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .target(env_logger::Target::Stdout)
        .parse_default_env();

    if verbose {
        builder.format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} [{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.target(),
                record.args()
            )
        });
    } else {
        builder.format(|buf, record| writeln!(buf, "{}", record.args()));
    }
    builder.init();
}

/// Print an empty line at info level.
pub(crate) fn log_blank() {
    log::info!("");
}

/// A multi-threaded runtime for the async commands.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new().map_err(|e| CliError::runtime(e.to_string()))
}
