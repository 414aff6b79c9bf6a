//! AI-assisted extraction.
//!
//! The model sees a bounded excerpt and must answer with one JSON object in
//! a fixed schema. Anything that does not parse as that schema counts as
//! "no contribution" and never fails the filing.

mod client;
mod config;
mod prompts;

pub use client::LlmClient;
pub use config::{LlmConfig, LlmProvider};
pub use prompts::{EXTRACTION_SYSTEM_PROMPT, EXTRACTION_USER_PROMPT};

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::fetch::truncate_chars;
use crate::models::{ExtractedMetrics, GradeUnit, MetricField};

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("LLM call timed out after {0}s")]
    Timeout(u64),

    #[error("API key required for OpenAI-compatible provider")]
    MissingApiKey,

    #[error("LLM is disabled")]
    Disabled,
}

/// Anything that can answer a system + user prompt pair.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

/// The declared output schema. Unknown keys or wrong types fail parsing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AiExtraction {
    pub project_name: Option<String>,
    pub country: Option<String>,
    pub jurisdiction: Option<String>,
    pub commodity: Option<String>,
    pub stage: Option<String>,
    pub description: Option<String>,
    pub capex_usd_m: Option<f64>,
    pub sustaining_capex_usd_m: Option<f64>,
    pub post_tax_npv_usd_m: Option<f64>,
    pub pre_tax_npv_usd_m: Option<f64>,
    pub irr_percent: Option<f64>,
    pub pre_tax_irr_percent: Option<f64>,
    pub payback_years: Option<f64>,
    pub mine_life_years: Option<f64>,
    pub annual_production_tonnes: Option<f64>,
    pub total_resource_tonnes: Option<f64>,
    pub total_reserve_tonnes: Option<f64>,
    pub resource_grade: Option<f64>,
    pub resource_grade_unit: Option<String>,
    pub opex_usd_per_tonne: Option<f64>,
    pub aisc_usd_per_tonne: Option<f64>,
}

impl AiExtraction {
    /// Numeric fields, range-checked the same way as pattern matches.
    pub fn metrics(&self) -> ExtractedMetrics {
        let mut metrics = ExtractedMetrics::default();
        let numeric = [
            (MetricField::CapexUsdM, self.capex_usd_m),
            (MetricField::SustainingCapexUsdM, self.sustaining_capex_usd_m),
            (MetricField::PostTaxNpvUsdM, self.post_tax_npv_usd_m),
            (MetricField::PreTaxNpvUsdM, self.pre_tax_npv_usd_m),
            (MetricField::IrrPercent, self.irr_percent),
            (MetricField::PreTaxIrrPercent, self.pre_tax_irr_percent),
            (MetricField::PaybackYears, self.payback_years),
            (MetricField::MineLifeYears, self.mine_life_years),
            (MetricField::AnnualProductionTonnes, self.annual_production_tonnes),
            (MetricField::TotalResourceTonnes, self.total_resource_tonnes),
            (MetricField::TotalReserveTonnes, self.total_reserve_tonnes),
            (MetricField::OpexUsdPerTonne, self.opex_usd_per_tonne),
            (MetricField::AiscUsdPerTonne, self.aisc_usd_per_tonne),
        ];
        for (field, value) in numeric {
            if let Some(value) = value {
                metrics.set(field, value);
            }
        }
        if let (Some(grade), Some(unit)) = (
            self.resource_grade,
            self.resource_grade_unit.as_deref().and_then(GradeUnit::from_str),
        ) {
            metrics.set_grade(grade, unit);
        }
        metrics
    }

    /// Trimmed text field, None when blank.
    pub fn text(value: &Option<String>) -> Option<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
            .map(str::to_string)
    }
}

/// Parse a model response as [`AiExtraction`], tolerating code fences and
/// text around the object.
pub fn parse_extraction(response: &str) -> Result<AiExtraction, LlmError> {
    let start = response
        .find('{')
        .ok_or_else(|| LlmError::Parse("No JSON object in response".to_string()))?;
    let end = response
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| LlmError::Parse("Unterminated JSON object".to_string()))?;
    serde_json::from_str(&response[start..=end]).map_err(|e| LlmError::Parse(e.to_string()))
}

/// Pick the excerpt to send: the executive summary when one can be found,
/// otherwise the start of the document.
pub fn select_excerpt(text: &str, max_chars: usize) -> &str {
    let lower = text.to_lowercase();
    // Lowercasing can change byte lengths; only trust positions when it didn't.
    let start = if lower.len() == text.len() {
        lower
            .match_indices("executive summary")
            .map(|(pos, _)| pos)
            .max_by_key(|pos| {
                let window = truncate_chars(&text[*pos..], 2_000);
                window.matches(['$', '%']).count()
            })
            .unwrap_or(0)
    } else {
        0
    };
    truncate_chars(&text[start..], max_chars)
}

/// Runs the structured extraction against a provider.
#[derive(Clone)]
pub struct AiExtractor {
    provider: Arc<dyn CompletionProvider>,
    max_content_chars: usize,
}

impl AiExtractor {
    pub fn new(provider: Arc<dyn CompletionProvider>, max_content_chars: usize) -> Self {
        Self {
            provider,
            max_content_chars,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn extract(&self, title: &str, text: &str) -> Result<AiExtraction, LlmError> {
        let excerpt = select_excerpt(text, self.max_content_chars);
        let user = EXTRACTION_USER_PROMPT
            .replace("{title}", title)
            .replace("{content}", excerpt);

        debug!(
            "AI extraction via {} ({} chars)",
            self.provider.name(),
            excerpt.len()
        );
        let response = self
            .provider
            .complete(EXTRACTION_SYSTEM_PROMPT, &user)
            .await?;
        parse_extraction(&response)
    }
}
