//! AI title guessing for filenames the catalog cannot match.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::error::ScrapeError;
use crate::types::truncate;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GUESS_TIMEOUT: Duration = Duration::from_secs(20);

/// Maximum number of candidate titles tried per ROM.
pub const MAX_GUESSES: usize = 3;

/// Suggests likely official titles for a ROM filename.
pub trait TitleGuesser: Send + Sync {
    fn guess_titles(
        &self,
        file_name: &str,
    ) -> impl Future<Output = Result<Vec<String>, ScrapeError>> + Send;
}

/// Title guesser backed by the Gemini `generateContent` endpoint.
pub struct GeminiGuesser {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiGuesser {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ScrapeError> {
        let http = reqwest::Client::builder().timeout(GUESS_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

fn prompt_for(file_name: &str) -> String {
    format!(
        "Based on the ROM filename \"{}\", what are the three most likely official game titles? \
         Provide just the titles, one per line, no numbering, no bullet points, no extra text.",
        file_name
    )
}

/// Split a model answer into at most [`MAX_GUESSES`] trimmed, non-empty titles.
pub fn parse_titles(answer: &str) -> Vec<String> {
    answer
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(MAX_GUESSES)
        .map(str::to_string)
        .collect()
}

impl TitleGuesser for GeminiGuesser {
    async fn guess_titles(&self, file_name: &str) -> Result<Vec<String>, ScrapeError> {
        let url = format!("{}/{}:generateContent", GEMINI_BASE_URL, self.model);
        let body = json!({ "contents": [{ "parts": [{ "text": prompt_for(file_name) }] }] });

        let resp = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ScrapeError::from_request(e, "title guess"))?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ScrapeError::Guess(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate(&text, 200)
            )));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)?;
        let answer = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| ScrapeError::Guess("response carried no text".to_string()))?;

        Ok(parse_titles(&answer))
    }
}
