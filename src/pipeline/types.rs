//! Pipeline events and per-filing outcomes.

use serde::Serialize;

use crate::models::FilingReference;

/// Why a filing ended up in the failure list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureCategory {
    /// Timeout, connection error or non-2xx response.
    Network,
    /// Fetched but not usable as text.
    Malformed,
    /// The store rejected the write.
    Persistence,
    /// The language model gave no usable answer.
    AiParse,
    /// A registry query, company or symbol lookup failed.
    Discovery,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Malformed => "malformed",
            Self::Persistence => "persistence",
            Self::AiParse => "ai-parse",
            Self::Discovery => "discovery",
        }
    }
}

/// Deliberate rejections. Not errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SkipReason {
    BelowThreshold { found: usize, required: usize },
    Irrelevant,
    Unparseable { error: String },
    ProtectedHigherConfidence { stored: f64, attempted: f64 },
}

/// Tagged result of processing one filing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum StageOutcome {
    Persisted {
        project_id: Option<i64>,
        project_name: String,
        confidence: f64,
        ai_enriched: bool,
    },
    Skipped(SkipReason),
    Failed {
        category: FailureCategory,
        error: String,
    },
}

/// Everything the orchestrator learns from one filing.
#[derive(Debug, Clone)]
pub struct FilingResult {
    pub filing: FilingReference,
    pub outcome: StageOutcome,
    /// The document was retrieved and cleaned.
    pub fetched: bool,
    /// The document met the confidence threshold.
    pub accepted: bool,
    /// Non-fatal problems, such as an unusable AI answer.
    pub warnings: Vec<(FailureCategory, String)>,
}

impl FilingResult {
    pub(crate) fn new(filing: FilingReference) -> Self {
        Self {
            filing,
            outcome: StageOutcome::Skipped(SkipReason::Irrelevant),
            fetched: false,
            accepted: false,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn finish(mut self, outcome: StageOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}

/// Progress events for whoever is watching the run.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    DiscoveryStarted {
        source: String,
    },
    DiscoveryFinished {
        source: String,
        found: usize,
        skipped_seen: usize,
        failures: usize,
    },
    /// Processing is about to start on this many filings.
    Queued {
        total: usize,
    },
    FilingStarted {
        accession_number: String,
        company_name: String,
    },
    FilingFinished {
        accession_number: String,
        outcome: StageOutcome,
    },
}
