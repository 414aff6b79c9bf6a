//! Turning cleaned document text into a scored project record.
//!
//! Pattern rules produce the numeric metrics and the descriptive fields;
//! an optional AI pass is merged on top with [`Extraction::merge_ai`].

mod descriptive;
mod patterns;

pub use descriptive::{detect_commodity, detect_location, detect_project_name, detect_stage};
pub use patterns::extract_metrics;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::llm::AiExtraction;
use crate::models::{
    Commodity, ExtractedMetrics, FilingReference, ProcessingStatus, Project, ProjectStage,
    RegistryId,
};
use crate::normalize::{normalize_commodity, normalize_stage};
use crate::score::{score, ConfidenceScore};

/// Descriptive (non-numeric) fields of a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveFields {
    pub project_name: Option<String>,
    pub country: Option<String>,
    pub jurisdiction: Option<String>,
    pub commodity: Commodity,
    /// `None` when the text names no study or production status.
    pub stage: Option<ProjectStage>,
    pub description: Option<String>,
}

impl DescriptiveFields {
    pub fn detect(text: &str) -> Self {
        let (country, jurisdiction) = detect_location(text);
        Self {
            project_name: detect_project_name(text),
            country,
            jurisdiction,
            commodity: detect_commodity(text),
            stage: detect_stage(text),
            description: None,
        }
    }
}

/// Result of extracting one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    pub metrics: ExtractedMetrics,
    pub descriptive: DescriptiveFields,
    pub score: ConfidenceScore,
    pub ai_enriched: bool,
}

impl Extraction {
    /// Pattern-only extraction, scored against `min_ratio`.
    pub fn from_text(text: &str, min_ratio: f64) -> Self {
        let metrics = extract_metrics(text);
        let score = score(&metrics, min_ratio);
        Self {
            metrics,
            descriptive: DescriptiveFields::detect(text),
            score,
            ai_enriched: false,
        }
    }

    pub fn accepted(&self) -> bool {
        self.score.accepted
    }

    /// Merge an AI answer: numeric fields only fill gaps, text fields
    /// replace pattern results when the model gave a value.
    pub fn merge_ai(&mut self, ai: &AiExtraction, min_ratio: f64) {
        let before = self.metrics.found_count();
        self.metrics.fill_missing_from(&ai.metrics());

        let mut contributed = self.metrics.found_count() > before;
        let d = &mut self.descriptive;

        if let Some(name) = AiExtraction::text(&ai.project_name) {
            d.project_name = Some(name);
            contributed = true;
        }
        if let Some(country) = AiExtraction::text(&ai.country) {
            d.country = Some(country);
            contributed = true;
        }
        if let Some(jurisdiction) = AiExtraction::text(&ai.jurisdiction) {
            d.jurisdiction = Some(jurisdiction);
            contributed = true;
        }
        if let Some(description) = AiExtraction::text(&ai.description) {
            d.description = Some(description);
            contributed = true;
        }
        // Unknown labels would degrade to the fallback; keep the detected value instead.
        if let Some(commodity) = AiExtraction::text(&ai.commodity)
            .map(|c| normalize_commodity(&c))
            .filter(|c| *c != Commodity::Other)
        {
            d.commodity = commodity;
            contributed = true;
        }
        if let Some(stage) = AiExtraction::text(&ai.stage) {
            let stage_lower = stage.to_lowercase();
            let normalized = normalize_stage(&stage);
            if normalized != ProjectStage::Exploration || stage_lower.contains("exploration") {
                d.stage = Some(normalized);
                contributed = true;
            }
        }

        let accepted = self.score.accepted;
        self.score = score(&self.metrics, min_ratio);
        self.score.accepted |= accepted;
        self.ai_enriched |= contributed;
    }

    /// Build the canonical record for `filing`.
    pub fn into_project(self, filing: &FilingReference, scraped_at: DateTime<Utc>) -> Project {
        let project_name = self
            .descriptive
            .project_name
            .unwrap_or_else(|| fallback_project_name(&filing.company_name));

        Project {
            id: None,
            project_name,
            company_name: filing.company_name.trim().to_string(),
            company_identifier: company_identifier(&filing.registry_id),
            country: self.descriptive.country,
            jurisdiction: self.descriptive.jurisdiction,
            commodity: self.descriptive.commodity,
            stage: self.descriptive.stage,
            description: self.descriptive.description,
            metrics: self.metrics,
            technical_report_url: filing.document_url.clone(),
            technical_report_date: filing.filing_date,
            data_source: filing.source,
            extraction_confidence: self.score.confidence,
            processing_status: if self.ai_enriched {
                ProcessingStatus::AiEnriched
            } else {
                ProcessingStatus::Extracted
            },
            last_scraped_at: scraped_at,
        }
    }
}

fn fallback_project_name(company_name: &str) -> String {
    format!("{} Project", company_name.trim())
}

fn company_identifier(id: &RegistryId) -> Option<String> {
    match id {
        RegistryId::Cik(_) => id.padded_cik(),
        RegistryId::Symbol(symbol) if !symbol.trim().is_empty() => {
            Some(symbol.trim().to_uppercase())
        }
        RegistryId::Symbol(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataSource, GradeUnit};
    use crate::score::DEFAULT_MIN_CONFIDENCE_RATIO;

    const FIXTURE: &str = "Technical Report Summary on the Salar Verde Lithium Project, Nevada. \
        Feasibility Study. The study estimates a post-tax NPV of $2,300 million at an 8% discount \
        rate and an IRR 25.1% post-tax. The initial CAPEX of $1,070 million covers the plant. \
        The mine life 40 years supports annual production of 80,000 tonnes lithium carbonate. \
        The resource has an average grade 0.23% Li.";

    fn filing() -> FilingReference {
        FilingReference {
            registry_id: RegistryId::Cik(1440972),
            accession_number: "0001440972-24-000012".to_string(),
            company_name: "Verde Lithium Corp".to_string(),
            form_type: "10-K".to_string(),
            filing_date: chrono::NaiveDate::from_ymd_opt(2024, 3, 1),
            document_url: "https://www.sec.gov/Archives/edgar/data/1440972/000144097224000012/ex96-1.htm"
                .to_string(),
            file_size: None,
            source: DataSource::EdgarCompany,
        }
    }

    #[test]
    fn test_fixture_extraction() {
        let extraction = Extraction::from_text(FIXTURE, DEFAULT_MIN_CONFIDENCE_RATIO);
        let m = &extraction.metrics;
        assert_eq!(m.post_tax_npv_usd_m, Some(2300.0));
        assert_eq!(m.irr_percent, Some(25.1));
        assert_eq!(m.capex_usd_m, Some(1070.0));
        assert_eq!(m.mine_life_years, Some(40.0));
        assert_eq!(m.annual_production_tonnes, Some(80_000.0));
        assert_eq!(m.resource_grade, Some(0.23));
        assert_eq!(m.resource_grade_unit, Some(GradeUnit::Percent));
        assert!(extraction.accepted());
        assert!(extraction.score.confidence >= 4.0);

        let project = extraction.into_project(&filing(), Utc::now());
        assert_eq!(project.project_name, "Salar Verde Lithium Project");
        assert_eq!(project.company_name, "Verde Lithium Corp");
        assert_eq!(project.company_identifier.as_deref(), Some("0001440972"));
        assert_eq!(project.commodity, Commodity::Lithium);
        assert_eq!(project.stage, Some(ProjectStage::Feasibility));
        assert_eq!(project.jurisdiction.as_deref(), Some("Nevada"));
        assert_eq!(project.processing_status, ProcessingStatus::Extracted);
    }

    #[test]
    fn test_regex_wins_numbers_ai_wins_text() {
        let mut extraction = Extraction::from_text(FIXTURE, DEFAULT_MIN_CONFIDENCE_RATIO);
        let ai = AiExtraction {
            project_name: Some("Salar Verde".to_string()),
            description: Some("Lithium brine project in Nevada.".to_string()),
            irr_percent: Some(30.0),
            payback_years: Some(3.5),
            stage: Some("gibberish".to_string()),
            ..Default::default()
        };
        extraction.merge_ai(&ai, DEFAULT_MIN_CONFIDENCE_RATIO);

        assert_eq!(extraction.metrics.irr_percent, Some(25.1));
        assert_eq!(extraction.metrics.payback_years, Some(3.5));
        assert_eq!(extraction.descriptive.project_name.as_deref(), Some("Salar Verde"));
        assert_eq!(extraction.descriptive.stage, Some(ProjectStage::Feasibility));
        assert_eq!(extraction.score.found, 7);
        assert!(extraction.ai_enriched);
    }

    #[test]
    fn test_fallback_project_name() {
        let extraction = Extraction::from_text("nothing useful here", DEFAULT_MIN_CONFIDENCE_RATIO);
        assert!(!extraction.accepted());
        let project = extraction.into_project(&filing(), Utc::now());
        assert_eq!(project.project_name, "Verde Lithium Corp Project");
        assert_eq!(project.stage, None);
    }

    #[test]
    fn test_ai_stage_fills_missing_stage() {
        let text = "Quarterly update on lithium brine operations in Nevada.";
        let mut extraction = Extraction::from_text(text, DEFAULT_MIN_CONFIDENCE_RATIO);
        assert_eq!(extraction.descriptive.stage, None);

        let unknown = AiExtraction {
            stage: Some("ongoing".to_string()),
            ..Default::default()
        };
        extraction.merge_ai(&unknown, DEFAULT_MIN_CONFIDENCE_RATIO);
        assert_eq!(extraction.descriptive.stage, None);

        let ai = AiExtraction {
            stage: Some("Exploration".to_string()),
            ..Default::default()
        };
        extraction.merge_ai(&ai, DEFAULT_MIN_CONFIDENCE_RATIO);
        assert_eq!(extraction.descriptive.stage, Some(ProjectStage::Exploration));
    }
}
