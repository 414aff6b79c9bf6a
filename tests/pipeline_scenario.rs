//! End-to-end batch over local fixture filings and a throwaway SQLite file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::mpsc;
use url::Url;

use minefile::discovery::{DiscoveryBatch, DiscoveryQuery, DiscoverySource, SeenFilings};
use minefile::fetch::ContentFetcher;
use minefile::http_client::HttpClient;
use minefile::models::{
    Commodity, DataSource, ExtractedMetrics, FilingReference, GradeUnit, ProcessingStatus,
    Project, ProjectStage, RegistryId,
};
use minefile::pipeline::{FailureCategory, Pipeline, PipelineOptions, RunReport};
use minefile::rate_limit::RateLimiter;
use minefile::repository::{
    run_migrations, DieselFilingRepository, DieselProjectRepository, LedgerOutcome, ProjectStore,
    SqlitePool, UpsertOutcome,
};

const FULL: &str = "Technical Report Summary on the Salar Verde Lithium Project, Nevada. \
    Feasibility Study. The study estimates a post-tax NPV of $2,300 million at an 8% discount \
    rate and an IRR 25.1% post-tax. The initial CAPEX of $1,070 million covers the plant. \
    The mine life 40 years supports annual production of 80,000 tonnes lithium carbonate. \
    The resource has an average grade 0.23% Li.";

/// Five checklist fields: exactly the acceptance threshold.
const FIVE: &str = "Technical Report Summary on the Salar Verde Lithium Project, Nevada. \
    Feasibility Study. The study estimates a post-tax NPV of $2,300 million at an 8% discount \
    rate and an IRR 25.1% post-tax. The initial CAPEX of $1,070 million covers the plant. \
    The mine life 40 years supports annual production of 80,000 tonnes lithium carbonate.";

/// Four checklist fields: one short.
const FOUR: &str = "Technical Report Summary on the Salar Verde Lithium Project, Nevada. \
    Feasibility Study. The study estimates a post-tax NPV of $2,300 million at an 8% discount \
    rate and an IRR 25.1% post-tax. \
    The mine life 40 years supports annual production of 80,000 tonnes lithium carbonate.";

/// Same project and figures as `FIVE`, but no study type named.
const NO_STUDY_UPDATE: &str = "Technical Report Summary on the Salar Verde Lithium Project, Nevada. \
    The update estimates a post-tax NPV of $2,300 million at an 8% discount \
    rate and an IRR 25.1% post-tax. The initial CAPEX of $1,070 million covers the plant. \
    The mine life 40 years supports annual production of 80,000 tonnes lithium carbonate.";

const IRR_150: &str = "Technical Report Summary on the Salar Verde Lithium Project, Nevada. \
    Feasibility Study. The study estimates a post-tax NPV of $2,300 million at an 8% discount \
    rate. The project delivers an IRR of 150% post-tax. The initial CAPEX of $1,070 million \
    covers the plant. The mine life 40 years supports annual production of 80,000 tonnes \
    lithium carbonate. The resource has an average grade 0.23% Li.";

/// Hands out a fixed list of filings, honouring the seen set like a registry would.
struct FixtureSource {
    filings: Vec<FilingReference>,
}

#[async_trait]
impl DiscoverySource for FixtureSource {
    fn name(&self) -> &str {
        "fixture"
    }

    fn data_source(&self) -> DataSource {
        DataSource::EdgarCompany
    }

    async fn discover(&self, query: &DiscoveryQuery, seen: &mut SeenFilings) -> DiscoveryBatch {
        let mut batch = DiscoveryBatch::default();
        for filing in &self.filings {
            if query.is_full(batch.filings.len()) {
                break;
            }
            if seen.admit(&filing.accession_number) {
                batch.filings.push(filing.clone());
            } else {
                batch.skipped_seen += 1;
            }
        }
        batch
    }
}

fn write_fixture(dir: &Path, name: &str, text: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    Url::from_file_path(&path).unwrap().to_string()
}

fn filing(cik: u64, accession: &str, company: &str, document_url: String) -> FilingReference {
    FilingReference {
        registry_id: RegistryId::Cik(cik),
        accession_number: accession.to_string(),
        company_name: company.to_string(),
        form_type: "10-K".to_string(),
        filing_date: NaiveDate::from_ymd_opt(2024, 3, 1),
        document_url,
        file_size: None,
        source: DataSource::EdgarCompany,
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    pool: SqlitePool,
    filings: Vec<FilingReference>,
}

impl Harness {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let database_url = format!("sqlite:{}", dir.path().join("minefile.db").display());
        run_migrations(&database_url).await.unwrap();

        let filings = vec![
            filing(
                1440972,
                "0001440972-24-000012",
                "Verde Lithium Corp",
                write_fixture(dir.path(), "full.txt", FULL),
            ),
            filing(
                1000005,
                "0001000005-24-000001",
                "Five Fields Inc",
                write_fixture(dir.path(), "five.txt", FIVE),
            ),
            filing(
                1000004,
                "0001000004-24-000001",
                "Four Fields Inc",
                write_fixture(dir.path(), "four.txt", FOUR),
            ),
            filing(
                1000150,
                "0001000150-24-000001",
                "Outlier Resources",
                write_fixture(dir.path(), "irr150.txt", IRR_150),
            ),
            filing(
                1000404,
                "0001000404-24-000001",
                "Missing Document Ltd",
                Url::from_file_path(dir.path().join("missing.txt"))
                    .unwrap()
                    .to_string(),
            ),
        ];

        Self {
            pool: SqlitePool::new(&database_url),
            _dir: dir,
            filings,
        }
    }

    fn pipeline(&self) -> Pipeline {
        let client = HttpClient::new(Duration::from_secs(5), RateLimiter::new(), None).unwrap();
        Pipeline::new(
            vec![Arc::new(FixtureSource {
                filings: self.filings.clone(),
            })],
            ContentFetcher::new(client, 500_000),
            Arc::new(DieselProjectRepository::new(self.pool.clone())),
            DieselFilingRepository::new(self.pool.clone()),
            PipelineOptions {
                concurrency: 2,
                min_confidence_ratio: 0.30,
                protect_higher_confidence: false,
                limit: None,
            },
        )
    }

    async fn run(&self) -> RunReport {
        let (tx, mut rx) = mpsc::channel(100);
        let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });
        let report = self
            .pipeline()
            .run(&DiscoveryQuery::default(), tx)
            .await
            .unwrap();
        drain.await.unwrap();
        report
    }
}

#[tokio::test]
async fn test_fixture_batch_persists_and_reports() {
    let harness = Harness::new().await;
    let report = harness.run().await;

    assert_eq!(report.discovered, 5);
    assert_eq!(report.fetched, 4);
    assert_eq!(report.accepted, 3);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.persisted, 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].category, FailureCategory::Malformed);
    assert!(report.finished_at.is_some());

    let projects = DieselProjectRepository::new(harness.pool.clone());
    assert_eq!(projects.count().await.unwrap(), 3);

    let stored = projects
        .get_by_key("Salar Verde Lithium Project", "Verde Lithium Corp")
        .await
        .unwrap()
        .expect("fixture project stored");
    let m = &stored.metrics;
    assert_eq!(m.post_tax_npv_usd_m, Some(2300.0));
    assert_eq!(m.irr_percent, Some(25.1));
    assert_eq!(m.capex_usd_m, Some(1070.0));
    assert_eq!(m.mine_life_years, Some(40.0));
    assert_eq!(m.annual_production_tonnes, Some(80_000.0));
    assert_eq!(m.resource_grade, Some(0.23));
    assert_eq!(m.resource_grade_unit, Some(GradeUnit::Percent));
    assert!(stored.extraction_confidence >= 4.0);
    assert_eq!(stored.commodity, Commodity::Lithium);
    assert_eq!(stored.stage, Some(ProjectStage::Feasibility));
    assert_eq!(stored.company_identifier.as_deref(), Some("0001440972"));
}

#[tokio::test]
async fn test_threshold_boundary() {
    let harness = Harness::new().await;
    harness.run().await;

    let projects = DieselProjectRepository::new(harness.pool.clone());
    let at_threshold = projects
        .get_by_key("Salar Verde Lithium Project", "Five Fields Inc")
        .await
        .unwrap();
    assert!(at_threshold.is_some());

    let below = projects
        .get_by_key("Salar Verde Lithium Project", "Four Fields Inc")
        .await
        .unwrap();
    assert!(below.is_none());

    let ledger = DieselFilingRepository::new(harness.pool.clone());
    let entry = ledger
        .get("0001000004-24-000001")
        .await
        .unwrap()
        .expect("rejection recorded");
    assert_eq!(
        LedgerOutcome::from_str(&entry.outcome),
        Some(LedgerOutcome::BelowThreshold)
    );
}

#[tokio::test]
async fn test_out_of_range_irr_is_not_stored() {
    let harness = Harness::new().await;
    harness.run().await;

    let stored = DieselProjectRepository::new(harness.pool.clone())
        .get_by_key("Salar Verde Lithium Project", "Outlier Resources")
        .await
        .unwrap()
        .expect("remaining five fields still pass");
    assert_eq!(stored.metrics.irr_percent, None);
    assert_eq!(stored.metrics.capex_usd_m, Some(1070.0));
}

#[tokio::test]
async fn test_later_filing_without_study_keeps_stage() {
    let mut harness = Harness::new().await;
    harness.run().await;

    let update_url = write_fixture(harness._dir.path(), "update.txt", NO_STUDY_UPDATE);
    harness.filings = vec![filing(
        1440972,
        "0001440972-24-000099",
        "Verde Lithium Corp",
        update_url.clone(),
    )];
    let report = harness.run().await;
    assert_eq!(report.persisted, 1);

    let stored = DieselProjectRepository::new(harness.pool.clone())
        .get_by_key("Salar Verde Lithium Project", "Verde Lithium Corp")
        .await
        .unwrap()
        .expect("project stored");
    assert_eq!(stored.stage, Some(ProjectStage::Feasibility));
    assert_eq!(stored.technical_report_url, update_url);
    assert_eq!(stored.metrics.resource_grade, Some(0.23));
}

#[tokio::test]
async fn test_rerun_skips_ingested_filings() {
    let harness = Harness::new().await;
    let first = harness.run().await;
    assert_eq!(first.discovered, 5);

    let second = harness.run().await;
    // The missing document was a terminal failure and is not retried either.
    assert_eq!(second.discovered, 0);
    assert_eq!(second.skipped_seen, 5);
    assert_eq!(second.persisted, 0);
}

fn project(metrics: ExtractedMetrics, url: &str, confidence: f64) -> Project {
    Project {
        id: None,
        project_name: "Rincon Project".to_string(),
        company_name: "Rincon Mining".to_string(),
        company_identifier: Some("RIO".to_string()),
        country: Some("Argentina".to_string()),
        jurisdiction: Some("Salta".to_string()),
        commodity: Commodity::Lithium,
        stage: Some(ProjectStage::Feasibility),
        description: None,
        metrics,
        technical_report_url: url.to_string(),
        technical_report_date: NaiveDate::from_ymd_opt(2024, 1, 15),
        data_source: DataSource::FilingsApi,
        extraction_confidence: confidence,
        processing_status: ProcessingStatus::Extracted,
        last_scraped_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_upsert_is_idempotent_and_preserves_omitted_fields() {
    let harness = Harness::new().await;
    let store = DieselProjectRepository::new(harness.pool.clone());

    let first = ExtractedMetrics {
        capex_usd_m: Some(800.0),
        post_tax_npv_usd_m: Some(1200.0),
        mine_life_years: Some(25.0),
        ..Default::default()
    };
    let second = ExtractedMetrics {
        post_tax_npv_usd_m: Some(1350.0),
        ..Default::default()
    };

    store
        .upsert(&project(first, "https://example.com/a.htm", 2.1), false)
        .await
        .unwrap();
    let outcome = store
        .upsert(&project(second, "https://example.com/b.htm", 0.7), false)
        .await
        .unwrap();

    let UpsertOutcome::Written(stored) = outcome else {
        panic!("expected a write");
    };
    assert_eq!(store.count().await.unwrap(), 1);
    assert_eq!(stored.technical_report_url, "https://example.com/b.htm");
    assert_eq!(stored.extraction_confidence, 0.7);
    assert_eq!(stored.metrics.post_tax_npv_usd_m, Some(1350.0));
    assert_eq!(stored.metrics.capex_usd_m, Some(800.0));
    assert_eq!(stored.metrics.mine_life_years, Some(25.0));
}
