//! Ledger of filings that reached a terminal outcome.
//!
//! Discovery loads the ledger so a restarted run skips work already done.
//! Transient failures are never recorded and get retried next run.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{IngestedFilingRecord, NewIngestedFiling};
use super::pool::{DbError, SqlitePool};
use crate::models::FilingReference;
use crate::schema::ingested_filings;

/// Terminal outcome of one filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerOutcome {
    Persisted,
    BelowThreshold,
    Irrelevant,
    Unparseable,
    ProtectedHigherConfidence,
}

impl LedgerOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Persisted => "persisted",
            Self::BelowThreshold => "below_threshold",
            Self::Irrelevant => "irrelevant",
            Self::Unparseable => "unparseable",
            Self::ProtectedHigherConfidence => "protected_higher_confidence",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "persisted" => Some(Self::Persisted),
            "below_threshold" => Some(Self::BelowThreshold),
            "irrelevant" => Some(Self::Irrelevant),
            "unparseable" => Some(Self::Unparseable),
            "protected_higher_confidence" => Some(Self::ProtectedHigherConfidence),
            _ => None,
        }
    }
}

/// Diesel-backed filing ledger.
#[derive(Clone)]
pub struct DieselFilingRepository {
    pool: SqlitePool,
}

impl DieselFilingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Accession numbers already in the ledger.
    pub async fn seen_accessions(&self) -> Result<Vec<String>, DbError> {
        let mut conn = self.pool.get().await?;

        ingested_filings::table
            .select(ingested_filings::accession_number)
            .load(&mut conn)
            .await
    }

    /// Record a terminal outcome, replacing any earlier entry.
    pub async fn record(
        &self,
        filing: &FilingReference,
        outcome: LedgerOutcome,
        project_id: Option<i64>,
        extraction_confidence: Option<f64>,
    ) -> Result<(), DbError> {
        let mut conn = self.pool.get().await?;
        let ingested_at = Utc::now().to_rfc3339();

        diesel::replace_into(ingested_filings::table)
            .values(&NewIngestedFiling {
                accession_number: &filing.accession_number,
                source: filing.source.as_str(),
                company_name: &filing.company_name,
                form_type: &filing.form_type,
                document_url: &filing.document_url,
                outcome: outcome.as_str(),
                project_id,
                extraction_confidence,
                ingested_at: &ingested_at,
            })
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    pub async fn get(&self, accession_number: &str) -> Result<Option<IngestedFilingRecord>, DbError> {
        let mut conn = self.pool.get().await?;

        ingested_filings::table
            .find(accession_number)
            .select(IngestedFilingRecord::as_select())
            .first(&mut conn)
            .await
            .optional()
    }
}
