//! ScreenScraper response types.
//!
//! The upstream JSON is loosely typed: numbers arrive as strings, lists
//! collapse to a bare object when they hold one entry, and text sometimes
//! carries escape sequences JSON does not allow. Everything is normalized
//! here so the rest of the crate sees plain Rust values.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use romscout_frontend::{GameMetadata, format_esde_date};

use crate::error::ScrapeError;

/// Game info from ScreenScraper's `jeuInfos.php`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct GameInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub notgame: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nom: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub noms: Vec<RegionText>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub synopsis: Vec<LangueText>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub dates: Vec<RegionText>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub medias: Vec<MediaCandidate>,
    #[serde(default)]
    pub editeur: Option<IdText>,
    #[serde(default)]
    pub developpeur: Option<IdText>,
    #[serde(default)]
    pub joueurs: Option<IdText>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub genres: Vec<Genre>,
}

impl GameInfo {
    /// Whether the catalog flags this entry as "not a game" (BIOS, demo disc...).
    pub fn is_not_game(&self) -> bool {
        matches!(
            self.notgame.as_deref().map(str::trim),
            Some("true") | Some("1")
        )
    }

    /// Display name: the first localized name, else the plain `nom` field.
    pub fn display_name(&self) -> Option<&str> {
        self.noms
            .iter()
            .map(|n| n.text.trim())
            .find(|t| !t.is_empty())
            .or_else(|| self.nom.as_deref().map(str::trim).filter(|t| !t.is_empty()))
    }

    /// Get the synopsis for a preferred language (exact match only).
    pub fn synopsis_for_language(&self, preferred: &str) -> Option<&str> {
        self.synopsis
            .iter()
            .find(|s| s.langue == preferred)
            .map(|s| s.text.as_str())
    }

    /// First genre's name, in the preferred language when available.
    pub fn genre_for_language(&self, preferred: &str) -> Option<&str> {
        let genre = self.genres.iter().find(|g| !g.noms.is_empty())?;
        genre
            .noms
            .iter()
            .find(|n| n.langue == preferred)
            .or_else(|| genre.noms.first())
            .map(|n| n.text.as_str())
    }

    /// First release date listed.
    pub fn release_date(&self) -> Option<&str> {
        self.dates
            .iter()
            .map(|d| d.text.as_str())
            .find(|t| !t.trim().is_empty())
    }

    /// Convert to descriptor metadata. `fallback_name` is used when the
    /// catalog entry has no usable name.
    pub fn to_metadata(&self, language: Option<&str>, fallback_name: &str) -> GameMetadata {
        let lang = language.unwrap_or("en");
        GameMetadata {
            name: self.display_name().unwrap_or(fallback_name).to_string(),
            description: self.synopsis_for_language(lang).map(|s| s.trim().to_string()),
            developer: id_text(&self.developpeur),
            publisher: id_text(&self.editeur),
            genre: self.genre_for_language(lang).map(str::to_string),
            players: id_text(&self.joueurs),
            release_date: self.release_date().and_then(format_esde_date),
        }
    }
}

fn id_text(field: &Option<IdText>) -> Option<String> {
    field
        .as_ref()
        .map(|t| t.text.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RegionText {
    #[serde(default)]
    pub region: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub text: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LangueText {
    #[serde(default)]
    pub langue: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub text: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IdText {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub text: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Genre {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub noms: Vec<LangueText>,
}

/// One downloadable media file offered by the catalog.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct MediaCandidate {
    /// Catalog media kind (`ss`, `box-2D`, `wheel`, `video`...)
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub region: String,
    /// File extension reported by the catalog; may be empty
    #[serde(default, deserialize_with = "lenient_text")]
    pub format: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub width: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub height: u64,
    /// Size in bytes; 0 when unknown
    #[serde(default, deserialize_with = "lenient_u64")]
    pub size: u64,
}

impl MediaCandidate {
    pub fn area(&self) -> u64 {
        self.width.saturating_mul(self.height)
    }
}

/// User info response from ssuserInfos.php.
#[derive(Debug, Deserialize)]
pub struct UserInfoResponse {
    pub response: UserInfoData,
}

#[derive(Debug, Deserialize)]
pub struct UserInfoData {
    pub ssuser: UserInfo,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct UserInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub maxthreads: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub requeststoday: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub maxrequestsperday: Option<String>,
}

impl UserInfo {
    pub fn requests_today(&self) -> u32 {
        self.requeststoday
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    pub fn max_requests_per_day(&self) -> u32 {
        self.maxrequestsperday
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(20000)
    }

    pub fn max_threads(&self) -> u32 {
        self.maxthreads
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1)
    }
}

/// Repair text so it parses as JSON: non-breaking spaces become plain
/// spaces and backslashes that do not start a valid escape are doubled.
pub fn repair_json_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\u{a0}' => out.push(' '),
            '\\' => match chars.peek() {
                Some('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u') => {
                    out.push('\\');
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                _ => out.push_str("\\\\"),
            },
            other => out.push(other),
        }
    }
    out
}

/// Parse a `jeuInfos.php` body.
///
/// Returns `Ok(None)` when the response carries no game object, and
/// `MalformedResponse` when the body is not JSON even after repair.
pub fn parse_game_response(text: &str) -> Result<Option<GameInfo>, ScrapeError> {
    let cleaned = repair_json_escapes(text);
    let value: Value = serde_json::from_str(&cleaned).map_err(|e| {
        ScrapeError::MalformedResponse(format!(
            "{e}. Response: {}",
            truncate(text, 200)
        ))
    })?;

    let Some(jeu) = value
        .get("response")
        .and_then(|r| r.get("jeu"))
        .filter(|j| j.is_object())
    else {
        return Ok(None);
    };

    GameInfo::deserialize(jeu)
        .map(Some)
        .map_err(|e| ScrapeError::MalformedResponse(format!("unexpected game shape: {e}")))
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(item)) => vec![item],
        None => Vec::new(),
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

#[cfg(test)]
#[path = "tests/types_tests.rs"]
mod tests;
