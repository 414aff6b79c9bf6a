//! Commercial filings API.
//!
//! Credentials are exchanged for a bearer token, cached for the life of the
//! source, and refreshed once if a lookup comes back 401.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::parse_registry_date;
use crate::config::FilingsApiSettings;
use crate::discovery::{DiscoveryBatch, DiscoveryError, DiscoveryQuery, DiscoverySource, SeenFilings};
use crate::http_client::HttpClient;
use crate::models::{DataSource, FilingReference, RegistryId};

#[derive(Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(alias = "token", alias = "accessToken")]
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FilingsResponse {
    Wrapped { filings: Vec<ApiFiling> },
    Bare(Vec<ApiFiling>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiFiling {
    #[serde(alias = "filing_id", alias = "accession_number")]
    id: String,
    symbol: Option<String>,
    #[serde(alias = "company")]
    company_name: Option<String>,
    #[serde(alias = "form")]
    form_type: Option<String>,
    #[serde(alias = "date")]
    filing_date: Option<String>,
    #[serde(alias = "url")]
    document_url: Option<String>,
    html_url: Option<String>,
    pdf_url: Option<String>,
    file_size: Option<u64>,
}

impl ApiFiling {
    /// Prefer the HTML rendering; links already carry the viewer token.
    fn into_filing(self, requested_symbol: &str) -> Option<FilingReference> {
        let document_url = self
            .html_url
            .or(self.document_url)
            .or(self.pdf_url)
            .filter(|u| !u.trim().is_empty())?;
        if self.id.trim().is_empty() {
            return None;
        }
        let symbol = self
            .symbol
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| requested_symbol.to_string())
            .to_uppercase();

        Some(FilingReference {
            registry_id: RegistryId::Symbol(symbol.clone()),
            accession_number: self.id,
            company_name: self.company_name.unwrap_or(symbol),
            form_type: self.form_type.unwrap_or_default(),
            filing_date: self.filing_date.as_deref().and_then(parse_registry_date),
            document_url,
            file_size: self.file_size,
            source: DataSource::FilingsApi,
        })
    }
}

enum Lookup {
    Filings(Vec<ApiFiling>),
    Unauthorized,
}

/// Per-symbol lookups against the commercial filings API.
pub struct FilingsApiSource {
    client: HttpClient,
    base_url: String,
    username: String,
    password: String,
    token: Mutex<Option<String>>,
}

impl FilingsApiSource {
    pub fn new(client: HttpClient, base_url: &str, username: &str, password: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            token: Mutex::new(None),
        }
    }

    pub fn from_settings(
        client: HttpClient,
        settings: &FilingsApiSettings,
    ) -> Result<Self, DiscoveryError> {
        match (&settings.base_url, &settings.username, &settings.password) {
            (Some(base_url), Some(username), Some(password)) if settings.has_credentials() => {
                Ok(Self::new(client, base_url, username, password))
            }
            _ => Err(DiscoveryError::Config(
                "filings API base URL, username and password are required".to_string(),
            )),
        }
    }

    async fn authenticate(&self) -> Result<String, DiscoveryError> {
        let url = format!("{}/auth/token", self.base_url);
        let body = TokenRequest {
            username: &self.username,
            password: &self.password,
        };
        let response = self.client.post_json(&url, &body, &[]).await?;
        if !response.is_success() {
            return Err(DiscoveryError::Auth(format!(
                "token exchange returned HTTP {}",
                response.status.as_u16()
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| DiscoveryError::Auth(format!("token response: {}", e)))?;
        debug!("Filings API token acquired");
        Ok(token.access_token)
    }

    /// Cached token, exchanging credentials on first use or after `invalidate`.
    async fn token(&self) -> Result<String, DiscoveryError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }
        let token = self.authenticate().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    async fn invalidate(&self) {
        *self.token.lock().await = None;
    }

    fn filings_url(&self, symbol: &str, query: &DiscoveryQuery) -> String {
        let mut url = format!(
            "{}/filings?symbol={}",
            self.base_url,
            urlencoding::encode(symbol)
        );
        if let Some(from) = query.date_from {
            url.push_str(&format!("&from={}", from.format("%Y-%m-%d")));
        }
        if let Some(to) = query.date_to {
            url.push_str(&format!("&to={}", to.format("%Y-%m-%d")));
        }
        url
    }

    async fn lookup(&self, url: &str, token: &str) -> Result<Lookup, DiscoveryError> {
        let headers = [("Authorization", format!("Bearer {}", token))];
        let response = self.client.get_with_headers(url, &headers).await?;
        if response.status.as_u16() == 401 {
            return Ok(Lookup::Unauthorized);
        }
        if !response.is_success() {
            return Err(DiscoveryError::Status {
                status: response.status.as_u16(),
                url: url.to_string(),
            });
        }
        let body: FilingsResponse = response
            .json()
            .await
            .map_err(|e| DiscoveryError::Parse(format!("filings listing: {}", e)))?;
        Ok(Lookup::Filings(match body {
            FilingsResponse::Wrapped { filings } => filings,
            FilingsResponse::Bare(filings) => filings,
        }))
    }

    async fn filings_for(
        &self,
        symbol: &str,
        query: &DiscoveryQuery,
    ) -> Result<Vec<ApiFiling>, DiscoveryError> {
        let url = self.filings_url(symbol, query);
        let token = self.token().await?;
        match self.lookup(&url, &token).await? {
            Lookup::Filings(filings) => Ok(filings),
            Lookup::Unauthorized => {
                self.invalidate().await;
                let token = self.token().await?;
                match self.lookup(&url, &token).await? {
                    Lookup::Filings(filings) => Ok(filings),
                    Lookup::Unauthorized => {
                        Err(DiscoveryError::Auth("token rejected after refresh".to_string()))
                    }
                }
            }
        }
    }
}

#[async_trait]
impl DiscoverySource for FilingsApiSource {
    fn name(&self) -> &str {
        "filings-api"
    }

    fn data_source(&self) -> DataSource {
        DataSource::FilingsApi
    }

    async fn discover(&self, query: &DiscoveryQuery, seen: &mut SeenFilings) -> DiscoveryBatch {
        let mut batch = DiscoveryBatch::default();

        for symbol in &query.symbols {
            if query.is_full(batch.filings.len()) {
                break;
            }
            let filings = match self.filings_for(symbol, query).await {
                Ok(filings) => filings,
                Err(e) => {
                    batch.fail(self.name(), symbol, e);
                    continue;
                }
            };
            for filing in filings.into_iter().filter_map(|f| f.into_filing(symbol)) {
                if query.is_full(batch.filings.len()) {
                    break;
                }
                if query.in_range(filing.filing_date) {
                    batch.push(filing, seen);
                }
            }
        }

        info!(
            "Filings API found {} new filings ({} already seen)",
            batch.filings.len(),
            batch.skipped_seen
        );
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_shapes() {
        let wrapped = r#"{"filings": [{"id": "F-1", "symbol": "lac", "company_name": "Lithium Americas",
            "form_type": "NI 43-101", "filing_date": "2023-11-02",
            "html_url": "https://viewer.example.com/f1?token=abc"}]}"#;
        let bare = r#"[{"filing_id": "F-2", "url": "https://viewer.example.com/f2.pdf?token=abc"}]"#;

        let FilingsResponse::Wrapped { filings } = serde_json::from_str(wrapped).unwrap() else {
            panic!("expected wrapped listing");
        };
        let filing = filings.into_iter().next().unwrap().into_filing("LAC").unwrap();
        assert_eq!(filing.registry_id, RegistryId::Symbol("LAC".to_string()));
        assert_eq!(filing.accession_number, "F-1");
        assert_eq!(filing.document_url, "https://viewer.example.com/f1?token=abc");
        assert_eq!(filing.source, DataSource::FilingsApi);

        let FilingsResponse::Bare(filings) = serde_json::from_str(bare).unwrap() else {
            panic!("expected bare listing");
        };
        let filing = filings.into_iter().next().unwrap().into_filing("SGML").unwrap();
        assert_eq!(filing.company_name, "SGML");
        assert_eq!(filing.filing_date, None);
    }

    #[test]
    fn test_filing_without_link_is_dropped() {
        let filing = ApiFiling {
            id: "F-3".to_string(),
            ..Default::default()
        };
        assert!(filing.into_filing("LAC").is_none());
    }
}
