//! Canonical project record and its closed vocabularies.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::filing::DataSource;
use super::metrics::ExtractedMetrics;

/// Primary commodity of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Commodity {
    Lithium,
    Copper,
    Gold,
    Silver,
    Nickel,
    Cobalt,
    Uranium,
    Zinc,
    Lead,
    IronOre,
    Graphite,
    RareEarths,
    Potash,
    Phosphate,
    Coal,
    Pgm,
    Vanadium,
    Manganese,
    Molybdenum,
    Tin,
    Tungsten,
    Antimony,
    Other,
}

impl Commodity {
    pub const ALL: [Commodity; 23] = [
        Self::Lithium,
        Self::Copper,
        Self::Gold,
        Self::Silver,
        Self::Nickel,
        Self::Cobalt,
        Self::Uranium,
        Self::Zinc,
        Self::Lead,
        Self::IronOre,
        Self::Graphite,
        Self::RareEarths,
        Self::Potash,
        Self::Phosphate,
        Self::Coal,
        Self::Pgm,
        Self::Vanadium,
        Self::Manganese,
        Self::Molybdenum,
        Self::Tin,
        Self::Tungsten,
        Self::Antimony,
        Self::Other,
    ];

    /// Label stored in the `commodity` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lithium => "Lithium",
            Self::Copper => "Copper",
            Self::Gold => "Gold",
            Self::Silver => "Silver",
            Self::Nickel => "Nickel",
            Self::Cobalt => "Cobalt",
            Self::Uranium => "Uranium",
            Self::Zinc => "Zinc",
            Self::Lead => "Lead",
            Self::IronOre => "Iron Ore",
            Self::Graphite => "Graphite",
            Self::RareEarths => "Rare Earths",
            Self::Potash => "Potash",
            Self::Phosphate => "Phosphate",
            Self::Coal => "Coal",
            Self::Pgm => "PGM",
            Self::Vanadium => "Vanadium",
            Self::Manganese => "Manganese",
            Self::Molybdenum => "Molybdenum",
            Self::Tin => "Tin",
            Self::Tungsten => "Tungsten",
            Self::Antimony => "Antimony",
            Self::Other => "Other",
        }
    }

    /// Exact inverse of [`as_str`](Self::as_str); free text goes through
    /// [`crate::normalize::normalize_commodity`].
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

/// Development stage of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProjectStage {
    Exploration,
    ResourceDefinition,
    Pea,
    PreFeasibility,
    Feasibility,
    Permitting,
    Construction,
    Production,
    CareAndMaintenance,
    Closed,
}

impl ProjectStage {
    pub const ALL: [ProjectStage; 10] = [
        Self::Exploration,
        Self::ResourceDefinition,
        Self::Pea,
        Self::PreFeasibility,
        Self::Feasibility,
        Self::Permitting,
        Self::Construction,
        Self::Production,
        Self::CareAndMaintenance,
        Self::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exploration => "Exploration",
            Self::ResourceDefinition => "Resource Definition",
            Self::Pea => "PEA",
            Self::PreFeasibility => "Pre-Feasibility",
            Self::Feasibility => "Feasibility",
            Self::Permitting => "Permitting",
            Self::Construction => "Construction",
            Self::Production => "Production",
            Self::CareAndMaintenance => "Care and Maintenance",
            Self::Closed => "Closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.as_str() == s)
    }
}

/// How far a stored record got through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Pattern extraction only.
    Extracted,
    /// Pattern extraction plus a language-model contribution.
    AiEnriched,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extracted => "extracted",
            Self::AiEnriched => "ai_enriched",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "extracted" => Some(Self::Extracted),
            "ai_enriched" => Some(Self::AiEnriched),
            _ => None,
        }
    }
}

/// A mining project, identified by `(project_name, company_name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Database row id (None until stored).
    pub id: Option<i64>,
    pub project_name: String,
    pub company_name: String,
    /// CIK or ticker of the filer.
    pub company_identifier: Option<String>,
    pub country: Option<String>,
    pub jurisdiction: Option<String>,
    pub commodity: Commodity,
    /// `None` until a document names a study or production status.
    pub stage: Option<ProjectStage>,
    pub description: Option<String>,
    pub metrics: ExtractedMetrics,
    pub technical_report_url: String,
    pub technical_report_date: Option<NaiveDate>,
    pub data_source: DataSource,
    /// Score in `0.0..=10.0`.
    pub extraction_confidence: f64,
    pub processing_status: ProcessingStatus,
    pub last_scraped_at: DateTime<Utc>,
}
