pub mod alt_names;
pub mod catalog;
pub mod client;
pub mod credentials;
pub mod error;
pub mod events;
pub mod guess;
pub mod job;
pub mod log;
pub mod lookup;
pub mod media;
pub mod scrape;
pub mod session;
pub mod settings;
pub mod systems;
pub mod types;

#[cfg(test)]
#[path = "tests/fakes.rs"]
mod fakes;

pub use alt_names::{AltNameMapping, AltNameStore};
pub use catalog::{Catalog, CatalogQuery};
pub use client::ScreenScraperClient;
pub use credentials::{
    CredentialSource, CredentialSources, Credentials, config_path, credential_sources,
};
pub use error::ScrapeError;
pub use events::{ProgressSink, ScrapeEvent};
pub use guess::{GeminiGuesser, TitleGuesser};
pub use job::{JobController, JobHandle, JobItem};
pub use log::{JobSummary, ProgressLog};
pub use lookup::{LookupMethod, LookupResult, Resolution, Resolver};
pub use media::{MediaMapping, MediaSelector, SelectionStrategy};
pub use scrape::{RomOutcome, Scraper};
pub use session::{
    ConfirmOutcome, ConfirmRequest, DiagnoseReport, SessionStager, StagedFile, cleanup_session,
    sweep_sessions,
};
pub use settings::{Settings, settings_path};
pub use systems::SystemMapping;
pub use types::GameInfo;
