//! Progress events and the sink that fans them out.
//!
//! Every event renders as one human-readable line. A [`ProgressSink`]
//! forwards each event to an optional channel (for live display) and an
//! optional [`ProgressLog`] (for external viewers), and carries the
//! cooperative cancellation flag checked between steps.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use romscout_frontend::MediaSlot;

use crate::log::{COMPLETE_LINE, INTERRUPTED_LINE, JobSummary, ProgressLog};
use crate::lookup::LookupMethod;

/// One line of the progress stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeEvent {
    JobStarted { total: usize },
    Progress { index: usize, total: usize },
    Linked { stem: String, slots: usize },
    Skipped { stem: String, reason: &'static str },
    Processing { stem: String },
    HashNotGame,
    Matched { method: LookupMethod },
    StageFailed { stage: &'static str, error: String },
    NameSearchUnavailable { system: String },
    TryingAltName { name: String, system: String },
    GuessUnavailable { system: String },
    GuessStarted { file_name: String },
    NoGuesses,
    TryingGuess { number: usize, title: String },
    AltNameSaved { stem: String, alt_name: String },
    AltNameSaveFailed { error: String },
    MediaExists { file: String },
    MediaReused { slot: MediaSlot, file: String },
    MediaSaved { file: String },
    MediaFailed { file: String, error: String },
    Updated { stem: String, downloaded: usize },
    NoMatch { stem: String },
    GuessTip,
    ItemFailed { rom: String, error: String },
    Interrupted,
    Summary(JobSummary),
    Complete,
}

impl fmt::Display for ScrapeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeEvent::JobStarted { total } => {
                write!(f, "Found {} ROM(s) to process.", total)
            }
            ScrapeEvent::Progress { index, total } => {
                write!(f, "--- Progress: [{}/{}] ---", index, total)
            }
            ScrapeEvent::Linked { stem, slots } => write!(
                f,
                "[SKIP] Metadata present. Linking {} existing local media file(s) for '{}'.",
                slots, stem
            ),
            ScrapeEvent::Skipped { stem, reason } => {
                write!(f, "[SKIP] {} for '{}'.", reason, stem)
            }
            ScrapeEvent::Processing { stem } => {
                write!(f, "--- [SCRAPE] Processing '{}' ---", stem)
            }
            ScrapeEvent::HashNotGame => f.write_str(
                "[INFO] SHA1 match found a 'notgame' entry. Discarding result and falling back to name search.",
            ),
            ScrapeEvent::Matched { method } => match method {
                LookupMethod::Hash => f.write_str("[INFO] Found match via SHA1 Hash."),
                LookupMethod::Name => f.write_str("[INFO] Found match via ROM Name."),
                LookupMethod::AltName { name, .. } => {
                    write!(f, "[INFO] Found match via Alternative Name ('{}').", name)
                }
                LookupMethod::AiGuess { title } => {
                    write!(f, "[INFO] Found match via AI Guess ('{}').", title)
                }
            },
            ScrapeEvent::StageFailed { stage, error } => {
                write!(f, "[WARN] {} lookup failed: {}", stage, error)
            }
            ScrapeEvent::NameSearchUnavailable { system } => write!(
                f,
                "[INFO] System '{}' has no catalog id. Skipping name search.",
                system
            ),
            ScrapeEvent::TryingAltName { name, system } => write!(
                f,
                "[ALT] Trying alternative name: '{}' on system '{}'...",
                name, system
            ),
            ScrapeEvent::GuessUnavailable { system } => write!(
                f,
                "[AI] System '{}' has no catalog id. Skipping title guesses.",
                system
            ),
            ScrapeEvent::GuessStarted { file_name } => write!(
                f,
                "[AI] No match found. Trying to guess game name for '{}'...",
                file_name
            ),
            ScrapeEvent::NoGuesses => f.write_str("[AI] Could not get title guesses."),
            ScrapeEvent::TryingGuess { number, title } => {
                write!(f, "[AI] Trying guess #{}: '{}'...", number, title)
            }
            ScrapeEvent::AltNameSaved { stem, alt_name } => write!(
                f,
                "[AI] Saved new alternate name: '{}' -> '{}'",
                stem, alt_name
            ),
            ScrapeEvent::AltNameSaveFailed { error } => {
                write!(f, "[ERROR] Could not write to the alternate-name table: {}", error)
            }
            ScrapeEvent::MediaExists { file } => {
                write!(f, "[SKIP] Media file already exists: {}", file)
            }
            ScrapeEvent::MediaReused { slot, file } => {
                write!(f, "[INFO] Reusing {} for {}.", file, slot)
            }
            ScrapeEvent::MediaSaved { file } => write!(f, "[SUCCESS] Saved: {}", file),
            ScrapeEvent::MediaFailed { file, error } => {
                write!(f, "[FAIL] Could not download {}: {}", file, error)
            }
            ScrapeEvent::Updated { stem, downloaded: 0 } => write!(
                f,
                "[SUCCESS] No new media downloaded. Updating gamelist entry for '{}'.",
                stem
            ),
            ScrapeEvent::Updated { stem, downloaded } => write!(
                f,
                "[SUCCESS] Downloaded {} new media file(s) for '{}'.",
                downloaded, stem
            ),
            ScrapeEvent::NoMatch { stem } => {
                write!(f, "[FAIL] No match found for '{}' after all attempts.", stem)
            }
            ScrapeEvent::GuessTip => f.write_str(
                "[INFO] Tip: set [ai] api_key in settings.toml to improve results for difficult filenames.",
            ),
            ScrapeEvent::ItemFailed { rom, error } => {
                write!(f, "[FATAL_ERROR] Scraping {} failed: {}", rom, error)
            }
            ScrapeEvent::Interrupted => f.write_str(INTERRUPTED_LINE),
            ScrapeEvent::Summary(summary) => write!(f, "{}", summary),
            ScrapeEvent::Complete => f.write_str(COMPLETE_LINE),
        }
    }
}

/// Destination for progress events plus the cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<ScrapeEvent>>,
    log: Option<Arc<ProgressLog>>,
    cancel: Arc<AtomicBool>,
}

impl ProgressSink {
    /// A sink that discards events and is never cancelled.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn new(
        tx: Option<mpsc::UnboundedSender<ScrapeEvent>>,
        log: Option<Arc<ProgressLog>>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self { tx, log, cancel }
    }

    /// A sink feeding a fresh channel; returns the receiving end too.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ScrapeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: Some(tx),
                ..Self::default()
            },
            rx,
        )
    }

    pub fn emit(&self, event: ScrapeEvent) {
        if let Some(log) = &self.log {
            log.append(&event.to_string());
        }
        if let Some(tx) = &self.tx {
            // Receiver gone means nobody is watching; the log still has it
            let _ = tx.send(event);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}
