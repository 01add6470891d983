use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::catalog::{Catalog, CatalogQuery};
use crate::credentials::Credentials;
use crate::error::ScrapeError;
use crate::types::{GameInfo, UserInfo, UserInfoResponse, parse_game_response, truncate};

const BASE_URL: &str = "https://api.screenscraper.fr/api2";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(1200);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP client for the ScreenScraper API with rate limiting.
pub struct ScreenScraperClient {
    http: reqwest::Client,
    creds: Credentials,
    language: Option<String>,
    last_request: Arc<Mutex<Instant>>,
}

impl ScreenScraperClient {
    /// Create a client. `language` is sent as `langue` unless it is empty
    /// or `"none"`.
    pub fn new(creds: Credentials, language: Option<&str>) -> Result<Self, ScrapeError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let language = language
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case("none"))
            .map(str::to_string);

        Ok(Self {
            http,
            creds,
            language,
            last_request: Arc::new(Mutex::new(Instant::now() - MIN_REQUEST_INTERVAL)),
        })
    }

    /// Get user info and quota from ssuserInfos.php. Used to validate
    /// credentials.
    pub async fn user_info(&self) -> Result<UserInfo, ScrapeError> {
        self.rate_limit().await;

        let resp = self
            .http
            .get(format!("{}/ssuserInfos.php", BASE_URL))
            .query(&self.base_params())
            .send()
            .await
            .map_err(|e| ScrapeError::from_request(e, "ssuserInfos.php"))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ScrapeError::InvalidCredentials(
                "Invalid developer or user credentials".to_string(),
            ));
        }

        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ScrapeError::ServerError {
                status: status.as_u16(),
                message: truncate(&text, 200).to_string(),
            });
        }
        let info: UserInfoResponse = serde_json::from_str(&text).map_err(|e| {
            ScrapeError::InvalidCredentials(format!(
                "Unexpected login response: {e}. Response: {}",
                truncate(&text, 200)
            ))
        })?;

        Ok(info.response.ssuser)
    }

    /// Look up a game by hash or by name.
    pub async fn lookup_game(&self, query: &CatalogQuery) -> Result<Option<GameInfo>, ScrapeError> {
        let mut params = self.base_params();
        match query {
            CatalogQuery::Hash { sha1 } => params.push(("sha1", sha1.clone())),
            CatalogQuery::Name { name, system_id } => {
                params.push(("romnom", name.clone()));
                params.push(("systemeid", system_id.clone()));
            }
        }

        self.rate_limit().await;
        log::debug!("jeuInfos.php lookup: {}", query);

        let resp = self
            .http
            .get(format!("{}/jeuInfos.php", BASE_URL))
            .query(&params)
            .send()
            .await
            .map_err(|e| ScrapeError::from_request(e, "jeuInfos.php"))?;

        let status = resp.status();
        let text = resp.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ScrapeError::InvalidCredentials(
                "Credentials rejected".to_string(),
            ));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ScrapeError::RateLimit);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ScrapeError::ServerError {
                status: status.as_u16(),
                message: truncate(&text, 200).to_string(),
            });
        }

        // ScreenScraper returns 200 with error text for some failures
        if text.contains("API fermé") || text.contains("API closed") {
            return Err(ScrapeError::ServerClosed(
                "ScreenScraper API is temporarily closed".to_string(),
            ));
        }
        if text.contains("Le quota de scrape journalier") {
            return Err(ScrapeError::QuotaExceeded { used: 0, max: 0 });
        }
        if text.trim().is_empty() || text.contains("Jeu non trouvé") || text.starts_with("Erreur") {
            return Ok(None);
        }

        parse_game_response(&text)
    }

    /// Download a media file. Media CDN downloads don't count against the
    /// API rate limit, so no pacing is applied here.
    ///
    /// The media server answers some failures with an HTML page and status
    /// 200; those bodies are rejected.
    pub async fn download_media(&self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::from_request(e, url))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::ServerError {
                status: status.as_u16(),
                message: format!("media download failed: {}", url),
            });
        }
        let is_html = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"));
        if is_html {
            return Err(ScrapeError::MalformedResponse(format!(
                "server returned an HTML page instead of media: {}",
                url
            )));
        }

        let bytes = resp.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Enforce rate limiting: wait until at least MIN_REQUEST_INTERVAL has
    /// passed since the last API request.
    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < MIN_REQUEST_INTERVAL {
            tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
        }
        *last = Instant::now();
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("devid", self.creds.dev_id.clone()),
            ("devpassword", self.creds.dev_password.clone()),
            ("softname", self.creds.soft_name.clone()),
            ("output", "json".to_string()),
        ];
        if let Some(ref id) = self.creds.user_id {
            params.push(("ssid", id.clone()));
        }
        if let Some(ref pw) = self.creds.user_password {
            params.push(("sspassword", pw.clone()));
        }
        if let Some(ref lang) = self.language {
            params.push(("langue", lang.clone()));
        }
        params
    }
}

impl Catalog for ScreenScraperClient {
    async fn lookup(&self, query: &CatalogQuery) -> Result<Option<GameInfo>, ScrapeError> {
        self.lookup_game(query).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        self.download_media(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(user: bool) -> Credentials {
        Credentials {
            dev_id: "dev".to_string(),
            dev_password: "secret".to_string(),
            soft_name: "romscout".to_string(),
            user_id: user.then(|| "me".to_string()),
            user_password: user.then(|| "pw".to_string()),
        }
    }

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn base_params_carry_credentials() {
        let client = ScreenScraperClient::new(creds(true), Some("fr")).unwrap();
        let params = client.base_params();
        assert_eq!(param(&params, "devid"), Some("dev"));
        assert_eq!(param(&params, "ssid"), Some("me"));
        assert_eq!(param(&params, "sspassword"), Some("pw"));
        assert_eq!(param(&params, "output"), Some("json"));
        assert_eq!(param(&params, "langue"), Some("fr"));
    }

    #[test]
    fn user_and_language_are_optional() {
        for language in [None, Some(""), Some(" none ")] {
            let client = ScreenScraperClient::new(creds(false), language).unwrap();
            let params = client.base_params();
            assert_eq!(param(&params, "ssid"), None);
            assert_eq!(param(&params, "langue"), None);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn requests_are_spaced_out() {
        let client = ScreenScraperClient::new(creds(false), None).unwrap();
        let start = Instant::now();
        client.rate_limit().await;
        assert!(start.elapsed() < MIN_REQUEST_INTERVAL);
        client.rate_limit().await;
        assert!(start.elapsed() >= MIN_REQUEST_INTERVAL);
    }
}
