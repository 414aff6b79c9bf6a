//! Run report.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::{FailureCategory, FilingResult, SkipReason, StageOutcome};
use crate::discovery::DiscoveryFailure;

/// One entry in the failure list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub category: FailureCategory,
    /// Accession number, or the query/company/symbol for discovery failures.
    pub target: String,
    pub error: String,
}

/// Summary of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub discovered: usize,
    pub skipped_seen: usize,
    pub fetched: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub persisted: usize,
    /// Accepted but not written because the stored row scored higher.
    pub protected: usize,
    pub failures: Vec<FailureRecord>,
}

impl RunReport {
    pub fn new(run_id: String) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            discovered: 0,
            skipped_seen: 0,
            fetched: 0,
            accepted: 0,
            rejected: 0,
            persisted: 0,
            protected: 0,
            failures: Vec::new(),
        }
    }

    pub fn record_discovery_failure(&mut self, failure: &DiscoveryFailure) {
        self.failures.push(FailureRecord {
            category: FailureCategory::Discovery,
            target: format!("{}: {}", failure.source, failure.target),
            error: failure.error.clone(),
        });
    }

    pub fn record(&mut self, result: &FilingResult) {
        let target = result.filing.accession_number.clone();
        self.fetched += usize::from(result.fetched);
        self.accepted += usize::from(result.accepted);

        for (category, error) in &result.warnings {
            self.failures.push(FailureRecord {
                category: *category,
                target: target.clone(),
                error: error.clone(),
            });
        }

        match &result.outcome {
            StageOutcome::Persisted { .. } => self.persisted += 1,
            StageOutcome::Skipped(SkipReason::BelowThreshold { .. })
            | StageOutcome::Skipped(SkipReason::Irrelevant) => self.rejected += 1,
            StageOutcome::Skipped(SkipReason::ProtectedHigherConfidence { .. }) => {
                self.protected += 1
            }
            StageOutcome::Skipped(SkipReason::Unparseable { error }) => {
                self.failures.push(FailureRecord {
                    category: FailureCategory::Malformed,
                    target,
                    error: error.clone(),
                });
            }
            StageOutcome::Failed { category, error } => {
                self.failures.push(FailureRecord {
                    category: *category,
                    target,
                    error: error.clone(),
                });
            }
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn failures_by_category(&self) -> BTreeMap<FailureCategory, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.failures {
            *counts.entry(failure.category).or_insert(0) += 1;
        }
        counts
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {}", self.run_id)?;
        writeln!(f, "  discovered:   {}", self.discovered)?;
        writeln!(f, "  already seen: {}", self.skipped_seen)?;
        writeln!(f, "  fetched:      {}", self.fetched)?;
        writeln!(f, "  accepted:     {}", self.accepted)?;
        writeln!(f, "  rejected:     {}", self.rejected)?;
        writeln!(f, "  persisted:    {}", self.persisted)?;
        if self.protected > 0 {
            writeln!(f, "  protected:    {}", self.protected)?;
        }

        if self.failures.is_empty() {
            return writeln!(f, "  failures:     none");
        }
        writeln!(f, "  failures:     {}", self.failures.len())?;
        for (category, count) in self.failures_by_category() {
            writeln!(f, "    {}: {}", category.as_str(), count)?;
            for failure in self.failures.iter().filter(|r| r.category == category) {
                writeln!(f, "      {} - {}", failure.target, failure.error)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataSource, FilingReference, RegistryId};

    fn result(outcome: StageOutcome, fetched: bool, accepted: bool) -> FilingResult {
        let filing = FilingReference {
            registry_id: RegistryId::Symbol("LAC".to_string()),
            accession_number: "F-1".to_string(),
            company_name: "Lithium Americas".to_string(),
            form_type: "10-K".to_string(),
            filing_date: None,
            document_url: "https://example.com".to_string(),
            file_size: None,
            source: DataSource::FilingsApi,
        };
        FilingResult {
            outcome,
            fetched,
            accepted,
            ..FilingResult::new(filing)
        }
    }

    #[test]
    fn test_counts_and_categories() {
        let mut report = RunReport::new("test".to_string());
        report.discovered = 4;

        let mut persisted = result(
            StageOutcome::Persisted {
                project_id: Some(1),
                project_name: "Thacker Pass Project".to_string(),
                confidence: 4.3,
                ai_enriched: false,
            },
            true,
            true,
        );
        persisted
            .warnings
            .push((FailureCategory::AiParse, "expected value".to_string()));
        report.record(&persisted);
        report.record(&result(
            StageOutcome::Skipped(SkipReason::BelowThreshold {
                found: 2,
                required: 5,
            }),
            true,
            false,
        ));
        report.record(&result(
            StageOutcome::Failed {
                category: FailureCategory::Network,
                error: "HTTP 503".to_string(),
            },
            false,
            false,
        ));
        report.finish();

        assert_eq!(report.fetched, 2);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.persisted, 1);

        let by_category = report.failures_by_category();
        assert_eq!(by_category.get(&FailureCategory::AiParse), Some(&1));
        assert_eq!(by_category.get(&FailureCategory::Network), Some(&1));

        let text = report.to_string();
        assert!(text.contains("persisted:    1"));
        assert!(text.contains("ai-parse: 1"));

        let json = report.to_json().unwrap();
        assert!(json.contains("\"category\": \"ai-parse\""));
    }
}
