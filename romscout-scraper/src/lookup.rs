//! Ordered fallback chain that turns a ROM file into a catalog match.
//!
//! 1. Hash match (skipped for excluded container formats; "not a game"
//!    hits fall through)
//! 2. Name match (only when the system has a catalog id)
//! 3. Alternate names from the alt-name table, in file order
//! 4. AI-guessed titles, when a guesser is configured; a hit is appended
//!    to the alt-name table so later runs stop at stage 3
//!
//! A failed stage (timeout, HTTP error, malformed body) is reported and the
//! chain moves on. Running out of stages is `NoMatch`, not an error.

use tokio::sync::Mutex;

use romscout_core::RomIdentity;

use crate::alt_names::{AltNameMapping, AltNameStore};
use crate::catalog::{Catalog, CatalogQuery};
use crate::error::ScrapeError;
use crate::events::{ProgressSink, ScrapeEvent};
use crate::guess::{MAX_GUESSES, TitleGuesser};
use crate::systems::SystemMapping;
use crate::types::GameInfo;

/// How a game was matched in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupMethod {
    /// Matched by SHA-1 of the file contents
    Hash,
    /// Matched by file stem
    Name,
    /// Matched through a row of the alt-name table
    AltName { name: String, system: String },
    /// Matched through an AI-guessed title
    AiGuess { title: String },
}

impl std::fmt::Display for LookupMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupMethod::Hash => write!(f, "hash"),
            LookupMethod::Name => write!(f, "name"),
            LookupMethod::AltName { .. } => write!(f, "alt-name"),
            LookupMethod::AiGuess { .. } => write!(f, "ai-guess"),
        }
    }
}

/// Result of a successful game lookup.
#[derive(Debug, Clone)]
pub struct LookupResult {
    pub game: GameInfo,
    pub method: LookupMethod,
    /// Alt-name row recorded because an AI guess matched
    pub added_alt_name: Option<AltNameMapping>,
}

/// Terminal outcome of the fallback chain.
#[derive(Debug, Clone)]
pub enum Resolution {
    Matched(LookupResult),
    NoMatch,
    /// The cancellation flag was seen between stages
    Cancelled,
}

/// Borrowed collaborators for one resolution.
pub struct Resolver<'a, C, G> {
    pub catalog: &'a C,
    pub guesser: Option<&'a G>,
    pub systems: &'a SystemMapping,
    pub alt_names: &'a Mutex<AltNameStore>,
}

impl<C: Catalog, G: TitleGuesser> Resolver<'_, C, G> {
    /// Run the fallback chain for one ROM in `system`.
    ///
    /// Only errors that make every later stage pointless (rejected
    /// credentials, closed API, exhausted quota) are returned as `Err`.
    pub async fn resolve(
        &self,
        rom: &RomIdentity,
        system: &str,
        progress: &ProgressSink,
    ) -> Result<Resolution, ScrapeError> {
        // Stage 1: hash
        if let Some(sha1) = rom.sha1.as_deref().filter(|_| !rom.is_hash_excluded()) {
            match self.query(&CatalogQuery::hash(sha1), "SHA1", progress).await? {
                Some(game) if game.is_not_game() => progress.emit(ScrapeEvent::HashNotGame),
                Some(game) => return Ok(self.matched(game, LookupMethod::Hash, progress)),
                None => {}
            }
        }
        if progress.is_cancelled() {
            return Ok(Resolution::Cancelled);
        }

        // Stage 2: name
        match self.systems.system_id(system) {
            Some(system_id) => {
                let query = CatalogQuery::name(&rom.stem, system_id);
                if let Some(game) = self.query(&query, "Name", progress).await? {
                    return Ok(self.matched(game, LookupMethod::Name, progress));
                }
            }
            None => progress.emit(ScrapeEvent::NameSearchUnavailable {
                system: system.to_string(),
            }),
        }

        // Stage 3: alternate names
        let alternates: Vec<AltNameMapping> = self
            .alt_names
            .lock()
            .await
            .candidates(&rom.stem, system)
            .into_iter()
            .cloned()
            .collect();
        for alt in &alternates {
            if progress.is_cancelled() {
                return Ok(Resolution::Cancelled);
            }
            let search_system = alt.search_system(system);
            progress.emit(ScrapeEvent::TryingAltName {
                name: alt.alt_name.clone(),
                system: search_system.to_string(),
            });
            let Some(system_id) = self.systems.system_id(search_system) else {
                progress.emit(ScrapeEvent::NameSearchUnavailable {
                    system: search_system.to_string(),
                });
                continue;
            };
            let query = CatalogQuery::name(&alt.alt_name, system_id);
            if let Some(game) = self.query(&query, "Alternative name", progress).await? {
                let method = LookupMethod::AltName {
                    name: alt.alt_name.clone(),
                    system: search_system.to_string(),
                };
                return Ok(self.matched(game, method, progress));
            }
        }

        // Stage 4: AI guesses
        let Some(guesser) = self.guesser else {
            return Ok(Resolution::NoMatch);
        };
        let Some(system_id) = self.systems.system_id(system) else {
            progress.emit(ScrapeEvent::GuessUnavailable {
                system: system.to_string(),
            });
            return Ok(Resolution::NoMatch);
        };
        if progress.is_cancelled() {
            return Ok(Resolution::Cancelled);
        }
        progress.emit(ScrapeEvent::GuessStarted {
            file_name: rom.file_name.clone(),
        });
        let titles = match guesser.guess_titles(&rom.file_name).await {
            Ok(titles) => titles,
            Err(e) => {
                log::debug!("Title guess for {} failed: {}", rom.file_name, e);
                Vec::new()
            }
        };
        if titles.is_empty() {
            progress.emit(ScrapeEvent::NoGuesses);
        }

        for (i, title) in titles.iter().take(MAX_GUESSES).enumerate() {
            if progress.is_cancelled() {
                return Ok(Resolution::Cancelled);
            }
            progress.emit(ScrapeEvent::TryingGuess {
                number: i + 1,
                title: title.clone(),
            });
            let query = CatalogQuery::name(title, system_id);
            if let Some(game) = self.query(&query, "AI guess", progress).await? {
                let mapping = AltNameMapping::new(&rom.stem, title, Some(system), None);
                let saved = self.alt_names.lock().await.append(mapping.clone());
                match saved {
                    Ok(()) => progress.emit(ScrapeEvent::AltNameSaved {
                        stem: rom.stem.clone(),
                        alt_name: title.clone(),
                    }),
                    Err(e) => progress.emit(ScrapeEvent::AltNameSaveFailed {
                        error: e.to_string(),
                    }),
                }
                let method = LookupMethod::AiGuess {
                    title: title.clone(),
                };
                return Ok(match self.matched(game, method, progress) {
                    Resolution::Matched(mut result) => {
                        result.added_alt_name = Some(mapping);
                        Resolution::Matched(result)
                    }
                    other => other,
                });
            }
        }

        Ok(Resolution::NoMatch)
    }

    /// One catalog query. Stage failures become `None` after being reported.
    async fn query(
        &self,
        query: &CatalogQuery,
        stage: &'static str,
        progress: &ProgressSink,
    ) -> Result<Option<GameInfo>, ScrapeError> {
        match self.catalog.lookup(query).await {
            Ok(found) => Ok(found),
            Err(e) if e.is_stage_failure() => {
                log::debug!("{} lookup for {} failed: {}", stage, query, e);
                progress.emit(ScrapeEvent::StageFailed {
                    stage,
                    error: e.to_string(),
                });
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn matched(&self, game: GameInfo, method: LookupMethod, progress: &ProgressSink) -> Resolution {
        progress.emit(ScrapeEvent::Matched {
            method: method.clone(),
        });
        Resolution::Matched(LookupResult {
            game,
            method,
            added_alt_name: None,
        })
    }
}

#[cfg(test)]
#[path = "tests/lookup_tests.rs"]
mod tests;
