use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::lookup::LookupMethod;

pub const STARTED_LINE: &str = "=== Scrape started ===";
pub const INTERRUPTED_LINE: &str = "=== Scrape interrupted by user ===";
pub const COMPLETE_LINE: &str = "Scraping complete.";

/// Append-only progress stream of the current (or last) batch job.
///
/// The file is truncated when a job starts, then receives one line per
/// event. External viewers tail it.
#[derive(Debug)]
pub struct ProgressLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl ProgressLog {
    /// Truncate the log and write the start header.
    pub fn start(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        writeln!(file, "{}", STARTED_LINE)?;
        writeln!(
            file,
            "Date: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        file.flush()?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Append one line. Write failures are logged, never propagated: a full
    /// disk must not abort the batch.
    pub fn append(&self, line: &str) {
        let mut file = match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(file, "{}", line).and_then(|_| file.flush()) {
            log::warn!("Could not write to {}: {}", self.path.display(), e);
        }
    }

    /// Read every line of a progress log. A missing file reads as empty.
    pub fn read_lines(path: &Path) -> io::Result<Vec<String>> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(text.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

/// Per-ROM result counts for one batch job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub scraped: usize,
    pub linked: usize,
    pub skipped: usize,
    pub no_match: usize,
    pub failed: usize,
    pub media_downloaded: usize,
    pub by_hash: usize,
    pub by_name: usize,
    pub by_alt_name: usize,
    pub by_ai_guess: usize,
}

impl JobSummary {
    pub fn record_match(&mut self, method: &LookupMethod, media_downloaded: usize) {
        self.scraped += 1;
        self.media_downloaded += media_downloaded;
        match method {
            LookupMethod::Hash => self.by_hash += 1,
            LookupMethod::Name => self.by_name += 1,
            LookupMethod::AltName { .. } => self.by_alt_name += 1,
            LookupMethod::AiGuess { .. } => self.by_ai_guess += 1,
        }
    }

    pub fn processed(&self) -> usize {
        self.scraped + self.linked + self.skipped + self.no_match + self.failed
    }
}

impl std::fmt::Display for JobSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Summary: {} scraped (hash: {}, name: {}, alt-name: {}, ai-guess: {}), \
             {} linked, {} skipped, {} no match, {} failed, {} media file(s) downloaded",
            self.scraped,
            self.by_hash,
            self.by_name,
            self.by_alt_name,
            self.by_ai_guess,
            self.linked,
            self.skipped,
            self.no_match,
            self.failed,
            self.media_downloaded
        )
    }
}
