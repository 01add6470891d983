use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::ScrapeError;

const DEFAULT_SOFT_NAME: &str = "romscout";

/// Credentials for authenticating with the ScreenScraper API.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub dev_id: String,
    pub dev_password: String,
    pub soft_name: String,
    pub user_id: Option<String>,
    pub user_password: Option<String>,
}

/// A stored secret: either plain text or explicitly base64-encoded.
///
/// ```toml
/// dev_password = "hunter2"
/// user_password = { base64 = "aHVudGVyMg==" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum Secret {
    Plain(String),
    Encoded { base64: String },
}

impl Secret {
    pub fn reveal(&self) -> Result<String, ScrapeError> {
        match self {
            Secret::Plain(s) => Ok(s.clone()),
            Secret::Encoded { base64 } => {
                let bytes = STANDARD.decode(base64.trim()).map_err(|e| {
                    ScrapeError::Config(format!("Invalid base64 credential: {}", e))
                })?;
                String::from_utf8(bytes).map_err(|_| {
                    ScrapeError::Config("Base64 credential is not valid UTF-8".to_string())
                })
            }
        }
    }
}

/// Where a credential field's value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from an environment variable.
    EnvVar(&'static str),
    /// Loaded from the config file.
    ConfigFile,
    /// Hard-coded default value.
    Default,
    /// Not set anywhere.
    Missing,
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnvVar(var) => write!(f, "env ${}", var),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
            Self::Missing => write!(f, "not set"),
        }
    }
}

/// Provenance of each credential field.
#[derive(Debug)]
pub struct CredentialSources {
    pub dev_id: CredentialSource,
    pub dev_password: CredentialSource,
    pub soft_name: CredentialSource,
    pub user_id: CredentialSource,
    pub user_password: CredentialSource,
}

/// TOML config file format.
#[derive(Debug, Default, serde::Deserialize)]
struct ConfigFile {
    screenscraper: Option<ScreenScraperConfig>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ScreenScraperConfig {
    dev_id: Option<Secret>,
    dev_password: Option<Secret>,
    soft_name: Option<String>,
    user_id: Option<Secret>,
    user_password: Option<Secret>,
}

const ENV_DEV_ID: &str = "SCREENSCRAPER_DEVID";
const ENV_DEV_PASSWORD: &str = "SCREENSCRAPER_DEVPASSWORD";
const ENV_SOFT_NAME: &str = "SCREENSCRAPER_SOFTNAME";
const ENV_USER_ID: &str = "SCREENSCRAPER_SSID";
const ENV_USER_PASSWORD: &str = "SCREENSCRAPER_SSPASSWORD";

impl Credentials {
    /// Load credentials from environment variables and the config file.
    ///
    /// Priority: env vars > config file. `path` overrides the default
    /// config location.
    pub fn load(path: Option<&Path>) -> Result<Self, ScrapeError> {
        let config = load_config_file(path)?;
        Self::resolve(&config, |var| std::env::var(var).ok())
    }

    fn resolve(
        config: &ScreenScraperConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ScrapeError> {
        let pick = |var: &str, secret: &Option<Secret>| -> Result<Option<String>, ScrapeError> {
            match env(var) {
                Some(v) => Ok(Some(v)),
                None => secret.as_ref().map(Secret::reveal).transpose(),
            }
        };

        let dev_id = pick(ENV_DEV_ID, &config.dev_id)?.ok_or_else(|| {
            ScrapeError::Config(format!(
                "Missing dev_id. Set {} env var or add to config file",
                ENV_DEV_ID
            ))
        })?;
        let dev_password = pick(ENV_DEV_PASSWORD, &config.dev_password)?.ok_or_else(|| {
            ScrapeError::Config(format!(
                "Missing dev_password. Set {} env var or add to config file",
                ENV_DEV_PASSWORD
            ))
        })?;
        let soft_name = env(ENV_SOFT_NAME)
            .or_else(|| config.soft_name.clone())
            .unwrap_or_else(|| DEFAULT_SOFT_NAME.to_string());

        Ok(Self {
            dev_id,
            dev_password,
            soft_name,
            user_id: pick(ENV_USER_ID, &config.user_id)?,
            user_password: pick(ENV_USER_PASSWORD, &config.user_password)?,
        })
    }
}

/// Return the path to the credentials config file.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("romscout").join("credentials.toml"))
}

/// Determine where each credential field is coming from.
pub fn credential_sources(path: Option<&Path>) -> CredentialSources {
    let config = load_config_file(path).unwrap_or_default();
    let source = |var: &'static str, in_file: bool, default: CredentialSource| {
        if std::env::var(var).is_ok() {
            CredentialSource::EnvVar(var)
        } else if in_file {
            CredentialSource::ConfigFile
        } else {
            default
        }
    };

    CredentialSources {
        dev_id: source(ENV_DEV_ID, config.dev_id.is_some(), CredentialSource::Missing),
        dev_password: source(
            ENV_DEV_PASSWORD,
            config.dev_password.is_some(),
            CredentialSource::Missing,
        ),
        soft_name: source(
            ENV_SOFT_NAME,
            config.soft_name.is_some(),
            CredentialSource::Default,
        ),
        user_id: source(ENV_USER_ID, config.user_id.is_some(), CredentialSource::Missing),
        user_password: source(
            ENV_USER_PASSWORD,
            config.user_password.is_some(),
            CredentialSource::Missing,
        ),
    }
}

fn load_config_file(path: Option<&Path>) -> Result<ScreenScraperConfig, ScrapeError> {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_path) else {
        return Ok(ScreenScraperConfig::default());
    };
    if !path.exists() {
        return Ok(ScreenScraperConfig::default());
    }
    let content = std::fs::read_to_string(&path)?;
    let config: ConfigFile = toml::from_str(&content).map_err(|e| {
        ScrapeError::Config(format!("Failed to parse {}: {}", path.display(), e))
    })?;
    Ok(config.screenscraper.unwrap_or_default())
}
