//! Single-flight batch job runner.
//!
//! At most one job runs per [`JobController`]. The job processes its items
//! strictly in order on a spawned task, checks the cancellation flag before
//! each item, and survives per-item errors and panics.

use std::any::Any;
use std::io;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use romscout_frontend::MergeMode;

use crate::catalog::Catalog;
use crate::error::ScrapeError;
use crate::events::{ProgressSink, ScrapeEvent};
use crate::guess::TitleGuesser;
use crate::log::{JobSummary, ProgressLog};
use crate::scrape::{RomOutcome, Scraper};

/// One ROM to scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobItem {
    pub system: String,
    /// Absolute path of the ROM file
    pub rom: PathBuf,
}

/// A started job: its live event stream and its completion.
pub struct JobHandle {
    pub events: mpsc::UnboundedReceiver<ScrapeEvent>,
    task: JoinHandle<JobSummary>,
}

impl JobHandle {
    /// Wait for the job to finish and return its summary.
    pub async fn wait(self) -> Result<JobSummary, ScrapeError> {
        self.task
            .await
            .map_err(|e| ScrapeError::Io(io::Error::other(e)))
    }
}

/// Start/cancel/status surface for batch jobs.
#[derive(Debug, Clone)]
pub struct JobController {
    running: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    progress_log: Option<PathBuf>,
}

/// Clears the running flag however the job ends.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl JobController {
    /// `progress_log` is truncated at every job start; `None` keeps the
    /// stream in memory only.
    pub fn new(progress_log: Option<PathBuf>) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(AtomicBool::new(false)),
            progress_log,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the running job to stop before its next item.
    pub fn cancel(&self) {
        if self.is_running() {
            log::info!("Cancellation requested");
        }
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Lines of the current (or last) job's progress log.
    pub fn progress_lines(&self) -> io::Result<Vec<String>> {
        match &self.progress_log {
            Some(path) => ProgressLog::read_lines(path),
            None => Ok(Vec::new()),
        }
    }

    /// Start a job on a background task. Fails with
    /// [`ScrapeError::JobAlreadyRunning`] instead of queueing.
    pub fn start<C, G>(
        &self,
        scraper: Arc<Scraper<C, G>>,
        items: Vec<JobItem>,
        mode: MergeMode,
    ) -> Result<JobHandle, ScrapeError>
    where
        C: Catalog + 'static,
        G: TitleGuesser + 'static,
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ScrapeError::JobAlreadyRunning);
        }
        let guard = RunningGuard(Arc::clone(&self.running));
        self.cancel.store(false, Ordering::SeqCst);

        let log = match &self.progress_log {
            Some(path) => match ProgressLog::start(path) {
                Ok(log) => Some(Arc::new(log)),
                Err(e) => {
                    log::warn!("Could not start progress log {}: {}", path.display(), e);
                    None
                }
            },
            None => None,
        };

        let (tx, events) = mpsc::unbounded_channel();
        let progress = ProgressSink::new(Some(tx), log, Arc::clone(&self.cancel));
        let task = tokio::spawn(async move {
            let _guard = guard;
            run_job(&scraper, &items, mode, &progress).await
        });
        Ok(JobHandle { events, task })
    }
}

async fn run_job<C: Catalog, G: TitleGuesser>(
    scraper: &Scraper<C, G>,
    items: &[JobItem],
    mode: MergeMode,
    progress: &ProgressSink,
) -> JobSummary {
    let total = items.len();
    let mut summary = JobSummary::default();
    let mut interrupted = false;
    progress.emit(ScrapeEvent::JobStarted { total });

    for (i, item) in items.iter().enumerate() {
        if progress.is_cancelled() {
            interrupted = true;
            break;
        }
        progress.emit(ScrapeEvent::Progress {
            index: i + 1,
            total,
        });

        let attempt = AssertUnwindSafe(scraper.scrape_rom(&item.system, &item.rom, mode, progress))
            .catch_unwind()
            .await;
        let error = match attempt {
            Ok(Ok(RomOutcome::Scraped { method, downloaded })) => {
                summary.record_match(&method, downloaded);
                continue;
            }
            Ok(Ok(RomOutcome::Linked { .. })) => {
                summary.linked += 1;
                continue;
            }
            Ok(Ok(RomOutcome::Skipped)) => {
                summary.skipped += 1;
                continue;
            }
            Ok(Ok(RomOutcome::NoMatch)) => {
                summary.no_match += 1;
                continue;
            }
            Ok(Ok(RomOutcome::Cancelled)) => {
                interrupted = true;
                break;
            }
            Ok(Err(e)) => e.to_string(),
            Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
        };

        summary.failed += 1;
        log::warn!("Scraping {} failed: {}", item.rom.display(), error);
        progress.emit(ScrapeEvent::ItemFailed {
            rom: item.rom.display().to_string(),
            error,
        });
    }

    progress.emit(ScrapeEvent::Summary(summary.clone()));
    progress.emit(if interrupted {
        ScrapeEvent::Interrupted
    } else {
        ScrapeEvent::Complete
    });
    summary
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
#[path = "tests/job_tests.rs"]
mod tests;
