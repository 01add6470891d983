use romscout_frontend::FrontendError;

/// Errors that can occur during scraping operations.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Malformed catalog response: {0}")]
    MalformedResponse(String),

    #[error("Rate limited by ScreenScraper API")]
    RateLimit,

    #[error("Daily quota exceeded ({used}/{max} requests)")]
    QuotaExceeded { used: u32, max: u32 },

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("ScreenScraper server is closed: {0}")]
    ServerClosed(String),

    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Alternate-name table error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gamelist error: {0}")]
    Store(#[from] FrontendError),

    #[error("Title guess failed: {0}")]
    Guess(String),

    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("Confirm failed after {moved} file(s) were moved: {message}")]
    PartialCommit { moved: usize, message: String },

    #[error("A scrape job is already running")]
    JobAlreadyRunning,
}

impl ScrapeError {
    /// Whether this error means a catalog stage simply failed and the
    /// fallback chain should move on.
    pub fn is_stage_failure(&self) -> bool {
        matches!(
            self,
            ScrapeError::Http(_)
                | ScrapeError::Timeout(_)
                | ScrapeError::MalformedResponse(_)
                | ScrapeError::RateLimit
                | ScrapeError::ServerError { .. }
                | ScrapeError::Json(_)
        )
    }

    /// Map a reqwest error, separating timeouts from other transport failures.
    pub(crate) fn from_request(err: reqwest::Error, what: &str) -> Self {
        if err.is_timeout() {
            ScrapeError::Timeout(what.to_string())
        } else {
            ScrapeError::Http(err)
        }
    }
}
