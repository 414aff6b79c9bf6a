//! EDGAR full-text search.
//!
//! Queries `efts.sec.gov/LATEST/search-index` and pages through the hits
//! with the `from` offset. Each hit names one document inside a filing.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::parse_registry_date;
use crate::discovery::{DiscoveryBatch, DiscoveryError, DiscoveryQuery, DiscoverySource, SeenFilings};
use crate::http_client::HttpClient;
use crate::models::{DataSource, FilingReference, RegistryId};

/// Full-text search endpoint.
const SEARCH_URL: &str = "https://efts.sec.gov/LATEST/search-index";

/// EDGAR archive root for document links.
pub(crate) const ARCHIVES_URL: &str = "https://www.sec.gov/Archives/edgar/data";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    /// `<accession>:<filename>`
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source")]
    source: HitSource,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HitSource {
    ciks: Vec<String>,
    display_names: Vec<String>,
    form: Option<String>,
    root_forms: Vec<String>,
    file_date: Option<String>,
    adsh: Option<String>,
    /// Exhibit type such as `EX-96.1`; the main document carries the form.
    file_type: Option<String>,
}

impl SearchHit {
    /// Technical report summaries (EX-96) rank above other exhibits, which
    /// rank above the main filing document.
    fn document_rank(&self) -> u8 {
        let filename = self
            .id
            .split_once(':')
            .map_or("", |(_, f)| f)
            .to_ascii_lowercase();
        let file_type = self
            .source
            .file_type
            .as_deref()
            .unwrap_or("")
            .to_ascii_uppercase();

        if file_type.starts_with("EX-96") || filename.contains("ex96") || filename.contains("ex-96") {
            2
        } else if file_type.starts_with("EX-") || filename.contains("ex99") || filename.contains("ex-99") {
            1
        } else {
            0
        }
    }
}

/// Accession number to (index in the batch, rank of the chosen document).
type Admitted = HashMap<String, (usize, u8)>;

/// Admit one hit. A filing already in the batch keeps its slot, but its
/// document is swapped when this hit ranks higher.
fn admit_hit(
    batch: &mut DiscoveryBatch,
    seen: &mut SeenFilings,
    admitted: &mut Admitted,
    filing: FilingReference,
    rank: u8,
) {
    if let Some((index, best)) = admitted.get_mut(&filing.accession_number) {
        if rank > *best {
            debug!(
                "{}: preferring {} over {}",
                filing.accession_number, filing.document_url, batch.filings[*index].document_url
            );
            batch.filings[*index].document_url = filing.document_url;
            *best = rank;
        }
        return;
    }
    let accession = filing.accession_number.clone();
    let index = batch.filings.len();
    if batch.push(filing, seen) {
        admitted.insert(accession, (index, rank));
    }
}

/// Full-text search over EDGAR filings.
pub struct EdgarSearchSource {
    client: HttpClient,
}

impl EdgarSearchSource {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    fn build_search_url(query: &DiscoveryQuery, phrase: &str, from: usize) -> String {
        let mut url = format!("{}?q={}", SEARCH_URL, urlencoding::encode(phrase));

        if query.date_from.is_some() || query.date_to.is_some() {
            url.push_str("&dateRange=custom");
            if let Some(from_date) = query.date_from {
                url.push_str(&format!("&startdt={}", from_date.format("%Y-%m-%d")));
            }
            if let Some(to_date) = query.date_to {
                url.push_str(&format!("&enddt={}", to_date.format("%Y-%m-%d")));
            }
        }
        if !query.form_types.is_empty() {
            let forms = query.form_types.join(",");
            url.push_str(&format!("&forms={}", urlencoding::encode(&forms)));
        }
        if from > 0 {
            url.push_str(&format!("&from={}", from));
        }
        url
    }

    async fn fetch_page(&self, url: &str) -> Result<Vec<SearchHit>, DiscoveryError> {
        let response = self.client.get(url).await?;
        if !response.is_success() {
            return Err(DiscoveryError::Status {
                status: response.status.as_u16(),
                url: url.to_string(),
            });
        }
        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| DiscoveryError::Parse(format!("search response: {}", e)))?;
        Ok(body.hits.hits)
    }

    async fn search_phrase(
        &self,
        query: &DiscoveryQuery,
        phrase: &str,
        seen: &mut SeenFilings,
        batch: &mut DiscoveryBatch,
        admitted: &mut Admitted,
    ) -> Result<(), DiscoveryError> {
        for page in 0..query.max_pages {
            let url = Self::build_search_url(query, phrase, page * query.page_size);
            let hits = self.fetch_page(&url).await?;
            debug!("{}: page {} returned {} hits", phrase, page, hits.len());
            let exhausted = hits.len() < query.page_size;

            for hit in hits {
                let Some(filing) = hit_to_filing(&hit) else {
                    continue;
                };
                if !query.in_range(filing.filing_date) || !query.wants_form(&filing.form_type) {
                    continue;
                }
                if !admitted.contains_key(&filing.accession_number)
                    && query.is_full(batch.filings.len())
                {
                    return Ok(());
                }
                admit_hit(batch, seen, admitted, filing, hit.document_rank());
            }
            if exhausted {
                break;
            }
        }
        Ok(())
    }
}

/// Company name from an EDGAR display name such as
/// `"Lithium Americas Corp.  (LAC)  (CIK 0001440972)"`.
fn clean_display_name(display_name: &str) -> String {
    display_name
        .split("  (")
        .next()
        .unwrap_or(display_name)
        .split(" (CIK")
        .next()
        .unwrap_or(display_name)
        .trim()
        .to_string()
}

fn hit_to_filing(hit: &SearchHit) -> Option<FilingReference> {
    let (id_accession, filename) = hit.id.split_once(':')?;
    let accession = hit
        .source
        .adsh
        .clone()
        .unwrap_or_else(|| id_accession.to_string());
    let cik: u64 = hit.source.ciks.first()?.trim().parse().ok()?;
    let form_type = hit
        .source
        .root_forms
        .first()
        .or(hit.source.form.as_ref())?
        .clone();
    let company_name = hit
        .source
        .display_names
        .first()
        .map(|n| clean_display_name(n))
        .unwrap_or_else(|| format!("CIK {}", cik));

    Some(FilingReference {
        registry_id: RegistryId::Cik(cik),
        document_url: format!(
            "{}/{}/{}/{}",
            ARCHIVES_URL,
            cik,
            accession.replace('-', ""),
            filename
        ),
        accession_number: accession,
        company_name,
        form_type,
        filing_date: hit.source.file_date.as_deref().and_then(parse_registry_date),
        file_size: None,
        source: DataSource::EdgarSearch,
    })
}

#[async_trait]
impl DiscoverySource for EdgarSearchSource {
    fn name(&self) -> &str {
        "edgar-search"
    }

    fn data_source(&self) -> DataSource {
        DataSource::EdgarSearch
    }

    async fn discover(&self, query: &DiscoveryQuery, seen: &mut SeenFilings) -> DiscoveryBatch {
        let mut batch = DiscoveryBatch::default();
        let mut admitted = Admitted::new();

        for phrase in &query.queries {
            if query.is_full(batch.filings.len()) {
                break;
            }
            if let Err(e) = self
                .search_phrase(query, phrase, seen, &mut batch, &mut admitted)
                .await
            {
                batch.fail(self.name(), phrase, e);
            }
        }

        info!(
            "EDGAR full-text search found {} new filings ({} already seen)",
            batch.filings.len(),
            batch.skipped_seen
        );
        batch
    }
}
