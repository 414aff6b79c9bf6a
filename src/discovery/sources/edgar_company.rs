//! Per-company EDGAR listing scan.
//!
//! The submissions feed lists a company's recent filings as parallel
//! arrays. EDGAR has no exhibit-level search, so for each wanted filing we
//! probe the conventional technical-report exhibit filenames with HEAD
//! requests and keep the first that exists.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::edgar_search::ARCHIVES_URL;
use super::parse_registry_date;
use crate::discovery::{DiscoveryBatch, DiscoveryError, DiscoveryQuery, DiscoverySource, SeenFilings};
use crate::http_client::HttpClient;
use crate::models::{DataSource, FilingReference, RegistryId};

const SUBMISSIONS_URL: &str = "https://data.sec.gov/submissions";

#[derive(Debug, Deserialize)]
struct Submissions {
    name: String,
    filings: SubmissionFilings,
}

#[derive(Debug, Deserialize)]
struct SubmissionFilings {
    recent: RecentFilings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RecentFilings {
    accession_number: Vec<String>,
    filing_date: Vec<String>,
    form: Vec<String>,
    primary_document: Vec<String>,
}

/// One row of the parallel arrays.
#[derive(Debug, Clone, PartialEq)]
struct RecentFiling {
    accession_number: String,
    filing_date: Option<chrono::NaiveDate>,
    form: String,
    primary_document: Option<String>,
}

impl RecentFilings {
    /// Zip the arrays; rows missing an accession number or form are dropped.
    fn rows(&self) -> Vec<RecentFiling> {
        self.accession_number
            .iter()
            .zip(self.form.iter())
            .enumerate()
            .map(|(i, (accession, form))| RecentFiling {
                accession_number: accession.clone(),
                filing_date: self
                    .filing_date
                    .get(i)
                    .and_then(|d| parse_registry_date(d)),
                form: form.clone(),
                primary_document: self
                    .primary_document
                    .get(i)
                    .filter(|d| !d.is_empty())
                    .cloned(),
            })
            .collect()
    }
}

/// Exhibit filenames to probe, most common first.
fn exhibit_candidates(primary_document: Option<&str>) -> Vec<String> {
    let mut candidates: Vec<String> = ["ex96-1.htm", "ex96.htm", "ex-96.htm", "ex99-1.htm", "ex-99.1.htm"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    // Filer agents name exhibits after the primary document: abc-10k.htm -> abc-ex96_1.htm
    if let Some(stem) = primary_document
        .and_then(|doc| doc.rsplit_once('.'))
        .map(|(stem, _)| stem)
    {
        let prefix = stem.rsplit_once('-').map_or(stem, |(prefix, _)| prefix);
        candidates.push(format!("{}-ex96_1.htm", prefix));
        candidates.push(format!("{}-ex961.htm", prefix));
        candidates.push(format!("{}ex961.htm", stem));
    }
    candidates
}

/// Scans each configured company's recent filings.
pub struct EdgarCompanySource {
    client: HttpClient,
}

impl EdgarCompanySource {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    async fn fetch_submissions(&self, cik: u64) -> Result<Submissions, DiscoveryError> {
        let url = format!("{}/CIK{:010}.json", SUBMISSIONS_URL, cik);
        let response = self.client.get(&url).await?;
        if !response.is_success() {
            return Err(DiscoveryError::Status {
                status: response.status.as_u16(),
                url,
            });
        }
        response
            .json()
            .await
            .map_err(|e| DiscoveryError::Parse(format!("submissions for CIK {}: {}", cik, e)))
    }

    /// First candidate exhibit that exists, with its size when reported.
    async fn probe_exhibit(
        &self,
        cik: u64,
        filing: &RecentFiling,
    ) -> Option<(String, Option<u64>)> {
        let base = format!(
            "{}/{}/{}",
            ARCHIVES_URL,
            cik,
            filing.accession_number.replace('-', "")
        );
        for candidate in exhibit_candidates(filing.primary_document.as_deref()) {
            let url = format!("{}/{}", base, candidate);
            match self.client.head(&url).await {
                Ok(head) if head.is_success() => return Some((url, head.content_length())),
                Ok(_) => {}
                Err(e) => debug!("Probe {} failed: {}", url, e),
            }
        }
        None
    }

    async fn scan_company(
        &self,
        cik: u64,
        query: &DiscoveryQuery,
        seen: &mut SeenFilings,
        batch: &mut DiscoveryBatch,
    ) -> Result<(), DiscoveryError> {
        let submissions = self.fetch_submissions(cik).await?;
        let rows = submissions.filings.recent.rows();
        debug!("CIK {}: {} recent filings", cik, rows.len());

        for row in rows {
            if query.is_full(batch.filings.len()) {
                break;
            }
            if !query.wants_form(&row.form) || !query.in_range(row.filing_date) {
                continue;
            }
            if seen.contains(&row.accession_number) {
                batch.skipped_seen += 1;
                continue;
            }
            let Some((document_url, file_size)) = self.probe_exhibit(cik, &row).await else {
                debug!("CIK {}: no technical exhibit in {}", cik, row.accession_number);
                continue;
            };

            batch.push(
                FilingReference {
                    registry_id: RegistryId::Cik(cik),
                    accession_number: row.accession_number,
                    company_name: submissions.name.trim().to_string(),
                    form_type: row.form,
                    filing_date: row.filing_date,
                    document_url,
                    file_size,
                    source: DataSource::EdgarCompany,
                },
                seen,
            );
        }
        Ok(())
    }
}

#[async_trait]
impl DiscoverySource for EdgarCompanySource {
    fn name(&self) -> &str {
        "edgar-company"
    }

    fn data_source(&self) -> DataSource {
        DataSource::EdgarCompany
    }

    async fn discover(&self, query: &DiscoveryQuery, seen: &mut SeenFilings) -> DiscoveryBatch {
        let mut batch = DiscoveryBatch::default();

        for &cik in &query.companies {
            if query.is_full(batch.filings.len()) {
                break;
            }
            if let Err(e) = self.scan_company(cik, query, seen, &mut batch).await {
                batch.fail(self.name(), &format!("CIK {}", cik), e);
            }
        }

        info!(
            "EDGAR company scan found {} new exhibits ({} already seen)",
            batch.filings.len(),
            batch.skipped_seen
        );
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parallel_arrays_zip() {
        let json = r#"{
            "cik": "1440972",
            "name": "Lithium Americas Corp.",
            "filings": {
                "recent": {
                    "accessionNumber": ["0001440972-24-000010", "0001440972-24-000011"],
                    "filingDate": ["2024-03-01", "2024-02-15"],
                    "form": ["10-K", "8-K"],
                    "primaryDocument": ["lac-20231231.htm", ""]
                }
            }
        }"#;
        let submissions: Submissions = serde_json::from_str(json).unwrap();
        let rows = submissions.filings.recent.rows();

        assert_eq!(submissions.name, "Lithium Americas Corp.");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].form, "10-K");
        assert_eq!(rows[0].filing_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(rows[0].primary_document.as_deref(), Some("lac-20231231.htm"));
        assert_eq!(rows[1].primary_document, None);
    }

    #[test]
    fn test_exhibit_candidates() {
        let candidates = exhibit_candidates(Some("lac-20231231.htm"));
        assert_eq!(candidates[0], "ex96-1.htm");
        assert!(candidates.contains(&"ex-99.1.htm".to_string()));
        assert!(candidates.contains(&"lac-ex96_1.htm".to_string()));

        assert_eq!(exhibit_candidates(None).len(), 5);
    }
}
