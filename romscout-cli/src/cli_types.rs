//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use romscout_frontend::MediaSlot;

#[derive(Parser)]
#[command(name = "romscout")]
#[command(about = "Scrape ROM metadata and media into gamelist.xml files", long_about = None)]
pub(crate) struct Cli {
    /// Settings file (defaults to ~/.config/romscout/settings.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Scrape metadata and media for one system folder
    Scrape {
        /// System folder name under the ROM root (e.g., megadrive)
        #[arg(short, long)]
        system: String,

        /// Scrape a single ROM instead of the whole folder
        #[arg(long)]
        rom: Option<PathBuf>,

        /// Re-scrape even when metadata and media are present
        #[arg(long)]
        force: bool,

        /// Overwrite existing text metadata
        #[arg(long)]
        force_metadata: bool,

        /// Treat stock pictures as missing media
        #[arg(long)]
        replace_stock: bool,
    },

    /// List the games in a system's gamelist and their media
    List {
        /// System folder name
        #[arg(short, long)]
        system: String,

        /// Only show games missing a requested media file
        #[arg(long)]
        missing: bool,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stage catalog media for a ROM into a review session
    Diagnose {
        /// System folder name
        #[arg(short, long)]
        system: String,

        /// Name to search the catalog for
        rom_name: String,

        /// Print the session as JSON
        #[arg(long)]
        json: bool,
    },

    /// Commit reviewed files from a diagnose session
    Confirm {
        /// Session id printed by `diagnose`
        #[arg(long)]
        session: String,

        /// System folder name of the ROM
        #[arg(short, long)]
        system: String,

        /// ROM path as stored in gamelist.xml (e.g., ./game.zip)
        #[arg(long)]
        rom_path: String,

        /// Confirmed game name
        #[arg(long)]
        name: String,

        /// Catalog system to use for this ROM from now on
        #[arg(long)]
        new_system: Option<String>,

        /// Staged file and the slot it fills (repeatable)
        #[arg(long = "file", value_name = "TEMP=SLOT", value_parser = parse_file_slot)]
        files: Vec<(String, MediaSlot)>,
    },

    /// Discard a diagnose session
    Cleanup {
        /// Session id printed by `diagnose`
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        session: Option<String>,

        /// Remove every leftover session
        #[arg(long)]
        all: bool,
    },

    /// Inspect settings and credentials
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show effective settings and where each credential comes from
    Show,

    /// Print the settings and credentials file paths
    Path,

    /// Test catalog credentials (and the title guesser, if configured)
    Test,
}

/// Parse `temp-name=slot` pairs for `confirm --file`.
pub(crate) fn parse_file_slot(s: &str) -> Result<(String, MediaSlot), String> {
    let (name, slot) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TEMP=SLOT, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing file name in '{}'", s));
    }
    let slot = MediaSlot::from_tag(slot.trim()).ok_or_else(|| {
        format!(
            "unknown slot '{}' (expected one of: image, video, marquee, thumbnail)",
            slot.trim()
        )
    })?;
    Ok((name.to_string(), slot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn file_slot_pairs() {
        assert_eq!(
            parse_file_slot("abc.png=thumbnail"),
            Ok(("abc.png".to_string(), MediaSlot::Thumbnail))
        );
        assert!(parse_file_slot("abc.png").is_err());
        assert!(parse_file_slot("=image").is_err());
        assert!(parse_file_slot("abc.png=poster").is_err());
    }

    #[test]
    fn confirm_collects_repeated_files() {
        let cli = Cli::try_parse_from([
            "romscout",
            "confirm",
            "--session",
            "id",
            "-s",
            "snes",
            "--rom-path",
            "./a.zip",
            "--name",
            "A",
            "--file",
            "x.png=image",
            "--file",
            "x.png=thumbnail",
        ])
        .unwrap();
        let Commands::Confirm { files, new_system, .. } = cli.command else {
            panic!("expected confirm");
        };
        assert_eq!(files.len(), 2);
        assert_eq!(new_system, None);
    }

    #[test]
    fn list_takes_a_system() {
        assert!(Cli::try_parse_from(["romscout", "list"]).is_err());
        let cli = Cli::try_parse_from(["romscout", "list", "-s", "snes", "--missing"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::List { ref system, missing: true, json: false } if system == "snes"
        ));
    }

    #[test]
    fn cleanup_needs_id_or_all() {
        assert!(Cli::try_parse_from(["romscout", "cleanup"]).is_err());
        assert!(Cli::try_parse_from(["romscout", "cleanup", "--all"]).is_ok());
        assert!(Cli::try_parse_from(["romscout", "cleanup", "id", "--all"]).is_err());
    }
}
