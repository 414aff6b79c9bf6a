//! Filing references produced by discovery.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which registry (and which mode of it) a filing came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// EDGAR full-text search hit.
    EdgarSearch,
    /// Exhibit located by scanning a company's EDGAR submission list.
    EdgarCompany,
    /// Commercial filings API.
    FilingsApi,
    /// Document supplied by hand (`minefile extract`).
    Manual,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EdgarSearch => "edgar_search",
            Self::EdgarCompany => "edgar_company",
            Self::FilingsApi => "filings_api",
            Self::Manual => "manual",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "edgar_search" | "edgar-search" => Some(Self::EdgarSearch),
            "edgar_company" | "edgar-company" => Some(Self::EdgarCompany),
            "filings_api" | "filings-api" => Some(Self::FilingsApi),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// Registry identifier of the filer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryId {
    /// SEC Central Index Key.
    Cik(u64),
    /// Exchange ticker symbol.
    Symbol(String),
}

impl RegistryId {
    /// CIK zero-padded to the ten digits EDGAR paths expect.
    pub fn padded_cik(&self) -> Option<String> {
        match self {
            Self::Cik(cik) => Some(format!("{:010}", cik)),
            Self::Symbol(_) => None,
        }
    }
}

impl std::fmt::Display for RegistryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cik(cik) => write!(f, "CIK {}", cik),
            Self::Symbol(symbol) => write!(f, "{}", symbol),
        }
    }
}

/// Immutable description of a discovered document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingReference {
    pub registry_id: RegistryId,
    /// Accession number or provider filing id; the deduplication key.
    pub accession_number: String,
    pub company_name: String,
    pub form_type: String,
    pub filing_date: Option<NaiveDate>,
    pub document_url: String,
    pub file_size: Option<u64>,
    pub source: DataSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_cik() {
        assert_eq!(
            RegistryId::Cik(1440972).padded_cik().as_deref(),
            Some("0001440972")
        );
        assert_eq!(RegistryId::Symbol("LAC".into()).padded_cik(), None);
    }

    #[test]
    fn test_data_source_round_trips_cli_names() {
        for source in [
            DataSource::EdgarSearch,
            DataSource::EdgarCompany,
            DataSource::FilingsApi,
        ] {
            assert_eq!(DataSource::from_str(source.as_str()), Some(source));
        }
        assert_eq!(
            DataSource::from_str("edgar-search"),
            Some(DataSource::EdgarSearch)
        );
        assert_eq!(DataSource::from_str("rss"), None);
    }
}
