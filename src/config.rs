//! Configuration: built-in defaults, an optional TOML file, then
//! environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http_client::{has_contact, resolve_user_agent};
use crate::llm::LlmConfig;
use crate::models::DataSource;
use crate::rate_limit::RateLimitConfig;
use crate::score::DEFAULT_MIN_CONFIDENCE_RATIO;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "minefile.toml";

/// Default database filename inside the data directory.
const DEFAULT_DATABASE_FILENAME: &str = "minefile.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// `[http]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Must carry a contact address for SEC fair access.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Minimum delay between requests to one domain, in milliseconds.
    pub request_delay_ms: u64,
    /// Ceiling for backoff after 429/503, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: None,
            request_timeout: 30,
            request_delay_ms: 200,
            max_delay_ms: 60_000,
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn user_agent(&self) -> String {
        resolve_user_agent(self.user_agent.as_deref())
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        let base = Duration::from_millis(self.request_delay_ms);
        RateLimitConfig {
            base_delay: base,
            min_delay: base,
            max_delay: Duration::from_millis(self.max_delay_ms.max(self.request_delay_ms)),
            ..RateLimitConfig::default()
        }
    }
}

/// `[pipeline]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Filings fetched and extracted at the same time.
    pub concurrency: usize,
    /// Text window kept from each document.
    pub max_document_chars: usize,
    /// Share of checklist metrics a document needs to be accepted.
    pub min_confidence_ratio: f64,
    /// Refuse to overwrite a stored row with a lower-confidence extraction.
    pub protect_higher_confidence: bool,
    /// Maximum filings processed per run.
    pub limit: Option<usize>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_document_chars: 500_000,
            min_confidence_ratio: DEFAULT_MIN_CONFIDENCE_RATIO,
            protect_higher_confidence: false,
            limit: None,
        }
    }
}

/// `[discovery]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    /// Registries queried, in order.
    pub sources: Vec<DataSource>,
    /// Full-text search phrases.
    pub queries: Vec<String>,
    /// Domain keywords; a hit must mention at least one.
    pub keywords: Vec<String>,
    /// Form types that carry technical exhibits.
    pub form_types: Vec<String>,
    /// CIKs scanned by the per-company listing.
    pub companies: Vec<u64>,
    /// Ticker symbols looked up in the commercial filings API.
    pub symbols: Vec<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Hits per search page.
    pub page_size: usize,
    pub max_pages: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            sources: vec![DataSource::EdgarSearch],
            queries: [
                "\"technical report summary\" \"feasibility study\"",
                "\"technical report summary\" \"preliminary economic assessment\"",
                "\"NI 43-101\" \"net present value\"",
            ]
            .map(String::from)
            .to_vec(),
            keywords: crate::discovery::DEFAULT_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            form_types: ["10-K", "10-K/A", "20-F", "40-F", "8-K", "6-K", "S-1"]
                .map(String::from)
                .to_vec(),
            companies: Vec::new(),
            symbols: Vec::new(),
            date_from: None,
            date_to: None,
            page_size: 100,
            max_pages: 5,
        }
    }
}

/// `[filings_api]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilingsApiSettings {
    pub base_url: Option<String>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl FilingsApiSettings {
    pub fn has_credentials(&self) -> bool {
        [&self.base_url, &self.username, &self.password]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

/// Resolved settings for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `sqlite:` URL or file path; defaults to the data directory.
    pub database_url: Option<String>,
    pub http: HttpSettings,
    pub pipeline: PipelineSettings,
    pub discovery: DiscoverySettings,
    pub filings_api: FilingsApiSettings,
    pub llm: LlmConfig,
    /// File these settings were read from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Settings {
    /// Load from `path`, or from `minefile.toml` in the working directory if
    /// it exists, then apply the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        Ok(settings.with_env_overrides())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.source_path = Some(path.to_path_buf());
        Ok(settings)
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn with_env_overrides(self) -> Self {
        self.apply_env(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("DATABASE_URL") {
            tracing::debug!("Using DATABASE_URL from environment: {}", url);
            self.database_url = Some(url);
        }
        if let Some(ua) = lookup("MINEFILE_USER_AGENT") {
            self.http.user_agent = Some(ua);
        }
        if let Some(secs) = lookup("MINEFILE_REQUEST_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.http.request_timeout = secs;
        }
        if let Some(ms) = lookup("MINEFILE_REQUEST_DELAY_MS").and_then(|v| v.parse().ok()) {
            self.http.request_delay_ms = ms;
        }
        if let Some(n) = lookup("MINEFILE_CONCURRENCY").and_then(|v| v.parse().ok()) {
            self.pipeline.concurrency = n;
        }
        if let Some(url) = lookup("FILINGS_API_URL") {
            self.filings_api.base_url = Some(url);
        }
        if let Some(user) = lookup("FILINGS_API_USERNAME") {
            self.filings_api.username = Some(user);
        }
        if let Some(password) = lookup("FILINGS_API_PASSWORD") {
            self.filings_api.password = Some(password);
        }
        self.llm = self.llm.apply_env(&lookup);
        self
    }

    /// Database URL, defaulting to `minefile.db` in the user data directory.
    pub fn database_url(&self) -> String {
        match &self.database_url {
            Some(url) => url.clone(),
            None => {
                let dir = dirs::data_dir()
                    .or_else(dirs::home_dir)
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("minefile");
                format!("sqlite:{}", dir.join(DEFAULT_DATABASE_FILENAME).display())
            }
        }
    }

    /// Checks that must pass before any network activity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery.sources.contains(&DataSource::FilingsApi)
            && !self.filings_api.has_credentials()
        {
            return Err(ConfigError::MissingCredentials(
                "filings API needs FILINGS_API_URL, FILINGS_API_USERNAME and FILINGS_API_PASSWORD"
                    .to_string(),
            ));
        }
        if self.llm.missing_credentials() {
            return Err(ConfigError::MissingCredentials(
                "OpenAI-compatible LLM provider needs LLM_API_KEY".to_string(),
            ));
        }
        if self.pipeline.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.concurrency must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.pipeline.min_confidence_ratio) {
            return Err(ConfigError::Invalid(format!(
                "pipeline.min_confidence_ratio must be within 0..=1, got {}",
                self.pipeline.min_confidence_ratio
            )));
        }
        if self.discovery.sources.contains(&DataSource::Manual) {
            return Err(ConfigError::Invalid(
                "\"manual\" is not a discovery source".to_string(),
            ));
        }
        if let (Some(from), Some(to)) = (self.discovery.date_from, self.discovery.date_to) {
            if from > to {
                return Err(ConfigError::Invalid(format!(
                    "date range is empty: {} is after {}",
                    from, to
                )));
            }
        }

        let user_agent = self.http.user_agent();
        if !has_contact(&user_agent) {
            tracing::warn!(
                "User agent has no contact address; SEC may block requests: {}",
                user_agent
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_validate() {
        let settings = Settings::default();
        assert_eq!(settings.http.request_delay_ms, 200);
        assert_eq!(settings.pipeline.min_confidence_ratio, 0.30);
        assert!(!settings.pipeline.protect_higher_confidence);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_toml_sections() {
        let settings = Settings::from_toml(
            r#"
            database_url = "sqlite:/tmp/projects.db"

            [http]
            user_agent = "Research Co ops@example.com"
            request_delay_ms = 500

            [pipeline]
            concurrency = 2
            protect_higher_confidence = true

            [discovery]
            sources = ["edgar_search", "edgar_company"]
            companies = [1440972]
            date_from = "2023-01-01"

            [llm]
            enabled = true
            model = "qwen2.5:14b"
            "#,
        )
        .unwrap();

        assert_eq!(settings.database_url(), "sqlite:/tmp/projects.db");
        assert_eq!(settings.http.request_delay_ms, 500);
        assert_eq!(settings.http.request_timeout, 30);
        assert_eq!(settings.pipeline.concurrency, 2);
        assert!(settings.pipeline.protect_higher_confidence);
        assert_eq!(
            settings.discovery.sources,
            vec![DataSource::EdgarSearch, DataSource::EdgarCompany]
        );
        assert_eq!(settings.discovery.companies, vec![1440972]);
        assert!(!settings.discovery.keywords.is_empty());
        assert!(settings.llm.enabled);
        assert_eq!(settings.llm.model, "qwen2.5:14b");
    }

    #[test]
    fn test_env_overrides_file() {
        let settings = Settings::default().apply_env(lookup(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("MINEFILE_CONCURRENCY", "8"),
            ("MINEFILE_REQUEST_DELAY_MS", "350"),
            ("LLM_ENABLED", "1"),
        ]));
        assert_eq!(settings.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(settings.pipeline.concurrency, 8);
        assert_eq!(settings.http.rate_limit_config().base_delay, Duration::from_millis(350));
        assert!(settings.llm.enabled);
    }

    #[test]
    fn test_filings_api_requires_credentials() {
        let mut settings = Settings::default();
        settings.discovery.sources.push(DataSource::FilingsApi);
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::MissingCredentials(_))
        ));

        let settings = settings.apply_env(lookup(&[
            ("FILINGS_API_URL", "https://filings.example.com"),
            ("FILINGS_API_USERNAME", "analyst"),
            ("FILINGS_API_PASSWORD", "hunter2"),
        ]));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_openai_provider_requires_key() {
        let settings = Settings::default()
            .apply_env(lookup(&[("LLM_ENABLED", "true"), ("LLM_PROVIDER", "openai")]));
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::MissingCredentials(_))
        ));
    }

    #[test]
    fn test_inverted_date_range_is_invalid() {
        let mut settings = Settings::default();
        settings.discovery.date_from = NaiveDate::from_ymd_opt(2024, 6, 1);
        settings.discovery.date_to = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }
}
