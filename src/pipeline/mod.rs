//! The discovery + extraction batch.
//!
//! Discovery runs source by source; the filings it finds are then fetched,
//! extracted, scored and persisted with bounded concurrency. Every filing
//! ends in a [`StageOutcome`] and the run ends in a [`RunReport`]. Progress
//! goes out on an event channel supplied by the caller.

mod report;
mod types;

pub use report::{FailureRecord, RunReport};
pub use types::{FailureCategory, FilingResult, PipelineEvent, SkipReason, StageOutcome};

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::discovery::{DiscoveryQuery, DiscoverySource, KeywordFilter, KeywordMatch, SeenFilings};
use crate::extract::Extraction;
use crate::fetch::{ContentFetcher, FetchError, RawDocumentText};
use crate::llm::{AiExtractor, LlmError};
use crate::models::FilingReference;
use crate::repository::{DbError, DieselFilingRepository, LedgerOutcome, ProjectStore, UpsertOutcome};
use crate::score::required_fields;

/// Batch-level failures. Anything else is reported per filing.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Discovery setup failed: {0}")]
    Discovery(#[from] crate::discovery::DiscoveryError),
}

/// Tunables for one run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub concurrency: usize,
    pub min_confidence_ratio: f64,
    pub protect_higher_confidence: bool,
    /// Maximum filings processed.
    pub limit: Option<usize>,
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            concurrency: settings.pipeline.concurrency.max(1),
            min_confidence_ratio: settings.pipeline.min_confidence_ratio,
            protect_higher_confidence: settings.pipeline.protect_higher_confidence,
            limit: settings.pipeline.limit,
        }
    }
}

/// Discovery -> fetch -> extract -> score -> persist.
pub struct Pipeline {
    sources: Vec<Arc<dyn DiscoverySource>>,
    fetcher: ContentFetcher,
    keywords: KeywordFilter,
    ai: Option<AiExtractor>,
    store: Arc<dyn ProjectStore>,
    ledger: DieselFilingRepository,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        sources: Vec<Arc<dyn DiscoverySource>>,
        fetcher: ContentFetcher,
        store: Arc<dyn ProjectStore>,
        ledger: DieselFilingRepository,
        options: PipelineOptions,
    ) -> Self {
        Self {
            sources,
            fetcher,
            keywords: KeywordFilter::default(),
            ai: None,
            store,
            ledger,
            options,
        }
    }

    pub fn with_keywords(mut self, keywords: KeywordFilter) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_ai(mut self, ai: AiExtractor) -> Self {
        self.ai = Some(ai);
        self
    }

    /// Run the whole batch.
    pub async fn run(
        &self,
        query: &DiscoveryQuery,
        events: mpsc::Sender<PipelineEvent>,
    ) -> Result<RunReport, PipelineError> {
        let mut report = RunReport::new(Uuid::new_v4().to_string());
        let mut seen = SeenFilings::new(self.ledger.seen_accessions().await?);
        info!(
            "Run {} starting; {} filings already in the ledger",
            report.run_id,
            seen.len()
        );
        if let Some(ai) = &self.ai {
            info!("AI extraction via {}", ai.provider_name());
        }

        let query = DiscoveryQuery {
            limit: self.options.limit.or(query.limit),
            ..query.clone()
        };

        let mut filings = Vec::new();
        for source in &self.sources {
            if query.is_full(filings.len()) {
                break;
            }
            let _ = events
                .send(PipelineEvent::DiscoveryStarted {
                    source: source.name().to_string(),
                })
                .await;

            let remaining = DiscoveryQuery {
                limit: query.limit.map(|limit| limit.saturating_sub(filings.len())),
                ..query.clone()
            };
            let batch = source.discover(&remaining, &mut seen).await;

            let _ = events
                .send(PipelineEvent::DiscoveryFinished {
                    source: source.name().to_string(),
                    found: batch.filings.len(),
                    skipped_seen: batch.skipped_seen,
                    failures: batch.failures.len(),
                })
                .await;

            report.skipped_seen += batch.skipped_seen;
            for failure in &batch.failures {
                report.record_discovery_failure(failure);
            }
            filings.extend(batch.filings);
        }
        if let Some(limit) = query.limit {
            filings.truncate(limit);
        }
        report.discovered = filings.len();

        let _ = events
            .send(PipelineEvent::Queued {
                total: filings.len(),
            })
            .await;

        let mut results = stream::iter(filings)
            .map(|filing| {
                let events = events.clone();
                async move {
                    let _ = events
                        .send(PipelineEvent::FilingStarted {
                            accession_number: filing.accession_number.clone(),
                            company_name: filing.company_name.clone(),
                        })
                        .await;
                    self.process_filing(filing).await
                }
            })
            .buffer_unordered(self.options.concurrency.max(1));

        while let Some(result) = results.next().await {
            report.record(&result);
            let _ = events
                .send(PipelineEvent::FilingFinished {
                    accession_number: result.filing.accession_number.clone(),
                    outcome: result.outcome.clone(),
                })
                .await;
        }

        report.finish();
        info!(
            "Run {} done: {} discovered, {} persisted, {} failures",
            report.run_id,
            report.discovered,
            report.persisted,
            report.failures.len()
        );
        Ok(report)
    }

    /// Fetch, extract, score and persist one filing.
    pub async fn process_filing(&self, filing: FilingReference) -> FilingResult {
        let url = filing.document_url.clone();
        let mut result = FilingResult::new(filing);

        let document = match self.fetcher.load(&url).await {
            Ok(document) => document,
            Err(e) if e.is_transient() => {
                warn!("Skipping {}: {}", url, e);
                return result.finish(StageOutcome::Failed {
                    category: FailureCategory::Network,
                    error: e.to_string(),
                });
            }
            Err(e) => return self.unparseable(result, e).await,
        };
        result.fetched = true;

        match self.keywords.check(&document.text) {
            KeywordMatch::Found(keyword) => {
                debug!("{} mentions {:?}", result.filing.accession_number, keyword)
            }
            KeywordMatch::Unfiltered => {}
            KeywordMatch::Missing => {
                debug!("{} mentions no domain keyword", result.filing.accession_number);
                self.record(&result.filing, LedgerOutcome::Irrelevant, None, None)
                    .await;
                return result.finish(StageOutcome::Skipped(SkipReason::Irrelevant));
            }
        }

        let min_ratio = self.options.min_confidence_ratio;
        let mut extraction = match extract_blocking(document.text.clone(), min_ratio).await {
            Some(extraction) => extraction,
            None => {
                return result.finish(StageOutcome::Failed {
                    category: FailureCategory::Malformed,
                    error: "extraction task panicked".to_string(),
                })
            }
        };

        if !extraction.accepted() {
            debug!(
                "{} below threshold: {}/{} fields {:?}",
                result.filing.accession_number,
                extraction.score.found,
                extraction.score.total,
                extraction.metrics.found_fields()
            );
            self.record(
                &result.filing,
                LedgerOutcome::BelowThreshold,
                None,
                Some(extraction.score.confidence),
            )
            .await;
            return result.finish(StageOutcome::Skipped(SkipReason::BelowThreshold {
                found: extraction.score.found,
                required: required_fields(min_ratio),
            }));
        }
        result.accepted = true;

        if let Some(ai) = &self.ai {
            if let Some(warning) = self.enrich(ai, &document, &mut extraction).await {
                result.warnings.push(warning);
            }
        }

        let ai_enriched = extraction.ai_enriched;
        let project = extraction.into_project(&result.filing, Utc::now());
        match self
            .store
            .upsert(&project, self.options.protect_higher_confidence)
            .await
        {
            Ok(UpsertOutcome::Written(stored)) => {
                info!(
                    "Persisted {} / {} (confidence {:.1})",
                    stored.project_name, stored.company_name, stored.extraction_confidence
                );
                self.record(
                    &result.filing,
                    LedgerOutcome::Persisted,
                    stored.id,
                    Some(stored.extraction_confidence),
                )
                .await;
                result.finish(StageOutcome::Persisted {
                    project_id: stored.id,
                    project_name: stored.project_name,
                    confidence: stored.extraction_confidence,
                    ai_enriched,
                })
            }
            Ok(UpsertOutcome::ProtectedHigherConfidence { stored_confidence }) => {
                info!(
                    "Kept stored {} / {} (confidence {:.1} > {:.1})",
                    project.project_name,
                    project.company_name,
                    stored_confidence,
                    project.extraction_confidence
                );
                self.record(
                    &result.filing,
                    LedgerOutcome::ProtectedHigherConfidence,
                    None,
                    Some(project.extraction_confidence),
                )
                .await;
                result.finish(StageOutcome::Skipped(SkipReason::ProtectedHigherConfidence {
                    stored: stored_confidence,
                    attempted: project.extraction_confidence,
                }))
            }
            Err(e) => {
                error!(
                    "Failed to persist ({}, {}): {}",
                    project.project_name, project.company_name, e
                );
                result.finish(StageOutcome::Failed {
                    category: FailureCategory::Persistence,
                    error: format!(
                        "({}, {}): {}",
                        project.project_name, project.company_name, e
                    ),
                })
            }
        }
    }

    async fn unparseable(&self, result: FilingResult, e: FetchError) -> FilingResult {
        warn!("{} is unusable: {}", result.filing.document_url, e);
        self.record(&result.filing, LedgerOutcome::Unparseable, None, None)
            .await;
        result.finish(StageOutcome::Skipped(SkipReason::Unparseable {
            error: e.to_string(),
        }))
    }

    /// Merge the AI answer into `extraction`; an unusable answer comes back as a warning.
    async fn enrich(
        &self,
        ai: &AiExtractor,
        document: &RawDocumentText,
        extraction: &mut Extraction,
    ) -> Option<(FailureCategory, String)> {
        let title = document.title.as_deref().unwrap_or(&document.url);
        match ai.extract(title, &document.text).await {
            Ok(answer) => {
                extraction.merge_ai(&answer, self.options.min_confidence_ratio);
                None
            }
            Err(LlmError::Disabled) => None,
            Err(e) => {
                warn!("No AI contribution for {}: {}", document.url, e);
                let category = match e {
                    LlmError::Parse(_) => FailureCategory::AiParse,
                    _ => FailureCategory::Network,
                };
                Some((category, e.to_string()))
            }
        }
    }

    /// Ledger writes are best effort; a failure only means the filing is retried.
    async fn record(
        &self,
        filing: &FilingReference,
        outcome: LedgerOutcome,
        project_id: Option<i64>,
        confidence: Option<f64>,
    ) {
        if let Err(e) = self
            .ledger
            .record(filing, outcome, project_id, confidence)
            .await
        {
            warn!(
                "Could not record {} in the ledger: {}",
                filing.accession_number, e
            );
        }
    }
}

/// Pattern extraction is CPU-bound on large documents.
async fn extract_blocking(text: String, min_ratio: f64) -> Option<Extraction> {
    tokio::task::spawn_blocking(move || Extraction::from_text(&text, min_ratio))
        .await
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::http_client::HttpClient;
    use crate::models::{DataSource, Project, RegistryId};
    use crate::rate_limit::RateLimiter;
    use crate::repository::{run_migrations, SqlitePool};

    const FIXTURE: &str = "Technical Report Summary on the Salar Verde Lithium Project, Nevada. \
        Feasibility Study. The study estimates a post-tax NPV of $2,300 million at an 8% discount \
        rate and an IRR 25.1% post-tax. The initial CAPEX of $1,070 million covers the plant. \
        The mine life 40 years supports annual production of 80,000 tonnes lithium carbonate.";

    struct FailingStore;

    #[async_trait]
    impl ProjectStore for FailingStore {
        async fn upsert(&self, _: &Project, _: bool) -> Result<UpsertOutcome, DbError> {
            Err(DbError::RollbackTransaction)
        }
    }

    async fn pipeline(dir: &std::path::Path, store: Arc<dyn ProjectStore>) -> Pipeline {
        let url = format!("sqlite:{}", dir.join("test.db").display());
        run_migrations(&url).await.unwrap();
        let client = HttpClient::new(Duration::from_secs(5), RateLimiter::new(), None).unwrap();
        Pipeline::new(
            Vec::new(),
            ContentFetcher::new(client, 100_000),
            store,
            DieselFilingRepository::new(SqlitePool::new(&url)),
            PipelineOptions {
                concurrency: 1,
                min_confidence_ratio: 0.30,
                protect_higher_confidence: false,
                limit: None,
            },
        )
    }

    fn filing(path: &std::path::Path) -> FilingReference {
        FilingReference {
            registry_id: RegistryId::Cik(1),
            accession_number: "0000000001-24-000001".to_string(),
            company_name: "Verde Lithium Corp".to_string(),
            form_type: "10-K".to_string(),
            filing_date: None,
            document_url: path.display().to_string(),
            file_size: None,
            source: DataSource::EdgarSearch,
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_is_reported_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("report.txt");
        std::fs::write(&doc, FIXTURE).unwrap();
        let pipeline = pipeline(dir.path(), Arc::new(FailingStore)).await;

        let result = pipeline.process_filing(filing(&doc)).await;
        assert!(result.fetched);
        assert!(result.accepted);
        match &result.outcome {
            StageOutcome::Failed { category, error } => {
                assert_eq!(*category, FailureCategory::Persistence);
                assert!(error.contains("Verde Lithium Corp"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        // Left out of the ledger so the next run retries it.
        assert!(pipeline.ledger.seen_accessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_off_topic_document_is_irrelevant() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("minutes.txt");
        std::fs::write(&doc, "Minutes of the annual shareholder meeting.").unwrap();
        let pipeline = pipeline(dir.path(), Arc::new(FailingStore)).await;

        let result = pipeline.process_filing(filing(&doc)).await;
        assert_eq!(result.outcome, StageOutcome::Skipped(SkipReason::Irrelevant));
        assert_eq!(
            pipeline.ledger.seen_accessions().await.unwrap(),
            vec!["0000000001-24-000001".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_keyword_list_lets_documents_through() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("minutes.txt");
        std::fs::write(&doc, "Minutes of the annual shareholder meeting.").unwrap();
        let pipeline = pipeline(dir.path(), Arc::new(FailingStore))
            .await
            .with_keywords(KeywordFilter::new::<&str>(&[]));

        let result = pipeline.process_filing(filing(&doc)).await;
        assert!(matches!(
            result.outcome,
            StageOutcome::Skipped(SkipReason::BelowThreshold { found: 0, .. })
        ));
    }
}
