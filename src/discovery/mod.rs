//! Filing discovery.
//!
//! Each registry is a [`DiscoverySource`]. Sources turn a [`DiscoveryQuery`]
//! into [`FilingReference`]s, skipping accession numbers the ledger already
//! holds. A failed registry call for one query, company or symbol is
//! recorded in the batch and never aborts it.

mod keywords;
pub mod sources;

pub use keywords::{KeywordFilter, KeywordMatch, DEFAULT_KEYWORDS};
pub use sources::{create_source, EdgarCompanySource, EdgarSearchSource, FilingsApiSource};

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::config::DiscoverySettings;
use crate::models::{DataSource, FilingReference};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Unexpected response: {0}")]
    Parse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// What to look for.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryQuery {
    /// Full-text search phrases.
    pub queries: Vec<String>,
    pub form_types: Vec<String>,
    /// CIKs for the per-company listing scan.
    pub companies: Vec<u64>,
    /// Ticker symbols for the commercial filings API.
    pub symbols: Vec<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub page_size: usize,
    pub max_pages: usize,
    /// Stop once this many new filings are found.
    pub limit: Option<usize>,
}

impl DiscoveryQuery {
    pub fn from_settings(settings: &DiscoverySettings, limit: Option<usize>) -> Self {
        Self {
            queries: settings.queries.clone(),
            form_types: settings.form_types.clone(),
            companies: settings.companies.clone(),
            symbols: settings.symbols.clone(),
            date_from: settings.date_from,
            date_to: settings.date_to,
            page_size: settings.page_size.max(1),
            max_pages: settings.max_pages.max(1),
            limit,
        }
    }

    /// Whether `date` falls inside the requested range. Undated filings pass.
    pub fn in_range(&self, date: Option<NaiveDate>) -> bool {
        let Some(date) = date else { return true };
        self.date_from.map_or(true, |from| date >= from)
            && self.date_to.map_or(true, |to| date <= to)
    }

    /// Whether `form` is one of the requested form types (all pass when none given).
    pub fn wants_form(&self, form: &str) -> bool {
        self.form_types.is_empty()
            || self
                .form_types
                .iter()
                .any(|wanted| wanted.eq_ignore_ascii_case(form.trim()))
    }

    pub fn is_full(&self, found: usize) -> bool {
        self.limit.is_some_and(|limit| found >= limit)
    }
}

/// Accession numbers that need no further work.
#[derive(Debug, Clone, Default)]
pub struct SeenFilings {
    ids: HashSet<String>,
}

impl SeenFilings {
    pub fn new(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn contains(&self, accession_number: &str) -> bool {
        self.ids.contains(accession_number)
    }

    /// Mark as seen; false if it already was.
    pub fn admit(&mut self, accession_number: &str) -> bool {
        self.ids.insert(accession_number.to_string())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One registry call that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryFailure {
    pub source: String,
    /// Query, company or symbol the call was for.
    pub target: String,
    pub error: String,
}

/// Output of one source.
#[derive(Debug, Default)]
pub struct DiscoveryBatch {
    pub filings: Vec<FilingReference>,
    pub failures: Vec<DiscoveryFailure>,
    /// Filings skipped because the ledger or this batch already had them.
    pub skipped_seen: usize,
}

impl DiscoveryBatch {
    /// Add `filing` unless its accession number was already seen.
    pub(crate) fn push(&mut self, filing: FilingReference, seen: &mut SeenFilings) -> bool {
        if seen.admit(&filing.accession_number) {
            self.filings.push(filing);
            true
        } else {
            self.skipped_seen += 1;
            false
        }
    }

    pub(crate) fn fail(&mut self, source: &str, target: &str, error: DiscoveryError) {
        tracing::warn!("{}: discovery failed for {}: {}", source, target, error);
        self.failures.push(DiscoveryFailure {
            source: source.to_string(),
            target: target.to_string(),
            error: error.to_string(),
        });
    }
}

/// A filing registry.
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    fn name(&self) -> &str;

    /// Tag stored as the project's `data_source`.
    fn data_source(&self) -> DataSource;

    /// Discover new filings. Filings whose accession number is in `seen`
    /// are counted and skipped without further requests; admitted ones are
    /// added to `seen`.
    async fn discover(&self, query: &DiscoveryQuery, seen: &mut SeenFilings) -> DiscoveryBatch;
}
