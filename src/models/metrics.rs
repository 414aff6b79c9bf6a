//! Extracted numeric metrics and the checklist used for scoring.
//!
//! Every field is optional: `None` means "not found", never zero. Values are
//! only admitted through [`ExtractedMetrics::set`] / [`ExtractedMetrics::set_grade`],
//! which enforce the positive-and-below-ceiling invariant.

use serde::{Deserialize, Serialize};

/// Unit a resource grade was reported in. Grades in different units are not
/// comparable and are never converted into one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradeUnit {
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "g/t")]
    GramsPerTonne,
    #[serde(rename = "oz/t")]
    OuncesPerTonne,
    #[serde(rename = "ppm")]
    Ppm,
}

impl GradeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percent => "%",
            Self::GramsPerTonne => "g/t",
            Self::OuncesPerTonne => "oz/t",
            Self::Ppm => "ppm",
        }
    }

    /// Parse the unit token as it appears in report text.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(' ', "").as_str() {
            "%" | "percent" | "pct" => Some(Self::Percent),
            "g/t" | "gpt" | "g/tonne" => Some(Self::GramsPerTonne),
            "oz/t" | "opt" | "oz/ton" => Some(Self::OuncesPerTonne),
            "ppm" => Some(Self::Ppm),
            _ => None,
        }
    }

    /// Largest plausible grade in this unit.
    pub fn ceiling(&self) -> f64 {
        match self {
            Self::Percent => 100.0,
            Self::GramsPerTonne => 10_000.0,
            Self::OuncesPerTonne => 300.0,
            Self::Ppm => 1_000_000.0,
        }
    }
}

/// One entry of the scoring checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricField {
    CapexUsdM,
    SustainingCapexUsdM,
    PostTaxNpvUsdM,
    PreTaxNpvUsdM,
    IrrPercent,
    PreTaxIrrPercent,
    PaybackYears,
    MineLifeYears,
    AnnualProductionTonnes,
    TotalResourceTonnes,
    TotalReserveTonnes,
    ResourceGrade,
    OpexUsdPerTonne,
    AiscUsdPerTonne,
}

/// Fixed checklist the confidence score is computed against.
pub const CHECKLIST: [MetricField; 14] = [
    MetricField::CapexUsdM,
    MetricField::SustainingCapexUsdM,
    MetricField::PostTaxNpvUsdM,
    MetricField::PreTaxNpvUsdM,
    MetricField::IrrPercent,
    MetricField::PreTaxIrrPercent,
    MetricField::PaybackYears,
    MetricField::MineLifeYears,
    MetricField::AnnualProductionTonnes,
    MetricField::TotalResourceTonnes,
    MetricField::TotalReserveTonnes,
    MetricField::ResourceGrade,
    MetricField::OpexUsdPerTonne,
    MetricField::AiscUsdPerTonne,
];

impl MetricField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CapexUsdM => "capex_usd_m",
            Self::SustainingCapexUsdM => "sustaining_capex_usd_m",
            Self::PostTaxNpvUsdM => "post_tax_npv_usd_m",
            Self::PreTaxNpvUsdM => "pre_tax_npv_usd_m",
            Self::IrrPercent => "irr_percent",
            Self::PreTaxIrrPercent => "pre_tax_irr_percent",
            Self::PaybackYears => "payback_years",
            Self::MineLifeYears => "mine_life_years",
            Self::AnnualProductionTonnes => "annual_production_tonnes",
            Self::TotalResourceTonnes => "total_resource_tonnes",
            Self::TotalReserveTonnes => "total_reserve_tonnes",
            Self::ResourceGrade => "resource_grade",
            Self::OpexUsdPerTonne => "opex_usd_per_tonne",
            Self::AiscUsdPerTonne => "aisc_usd_per_tonne",
        }
    }

    /// Exclusive upper bound for an accepted value. Resource grade is bounded
    /// per unit by [`GradeUnit::ceiling`] instead.
    pub fn ceiling(&self) -> f64 {
        match self {
            Self::CapexUsdM | Self::SustainingCapexUsdM => 100_000.0,
            Self::PostTaxNpvUsdM | Self::PreTaxNpvUsdM => 200_000.0,
            Self::IrrPercent | Self::PreTaxIrrPercent => 100.0,
            Self::PaybackYears => 50.0,
            Self::MineLifeYears => 100.0,
            Self::AnnualProductionTonnes => 1e9,
            Self::TotalResourceTonnes | Self::TotalReserveTonnes => 1e11,
            Self::ResourceGrade => f64::INFINITY,
            Self::OpexUsdPerTonne | Self::AiscUsdPerTonne => 100_000.0,
        }
    }
}

/// Sparse bag of typed metric values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capex_usd_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sustaining_capex_usd_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_tax_npv_usd_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_tax_npv_usd_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_tax_irr_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payback_years: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mine_life_years: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_production_tonnes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_resource_tonnes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_reserve_tonnes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_grade: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_grade_unit: Option<GradeUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opex_usd_per_tonne: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aisc_usd_per_tonne: Option<f64>,
}

/// Whether `value` is admissible below `ceiling`.
pub(crate) fn in_range(value: f64, ceiling: f64) -> bool {
    value.is_finite() && value > 0.0 && value < ceiling
}

impl ExtractedMetrics {
    pub fn get(&self, field: MetricField) -> Option<f64> {
        match field {
            MetricField::CapexUsdM => self.capex_usd_m,
            MetricField::SustainingCapexUsdM => self.sustaining_capex_usd_m,
            MetricField::PostTaxNpvUsdM => self.post_tax_npv_usd_m,
            MetricField::PreTaxNpvUsdM => self.pre_tax_npv_usd_m,
            MetricField::IrrPercent => self.irr_percent,
            MetricField::PreTaxIrrPercent => self.pre_tax_irr_percent,
            MetricField::PaybackYears => self.payback_years,
            MetricField::MineLifeYears => self.mine_life_years,
            MetricField::AnnualProductionTonnes => self.annual_production_tonnes,
            MetricField::TotalResourceTonnes => self.total_resource_tonnes,
            MetricField::TotalReserveTonnes => self.total_reserve_tonnes,
            MetricField::ResourceGrade => self.resource_grade,
            MetricField::OpexUsdPerTonne => self.opex_usd_per_tonne,
            MetricField::AiscUsdPerTonne => self.aisc_usd_per_tonne,
        }
    }

    fn slot(&mut self, field: MetricField) -> &mut Option<f64> {
        match field {
            MetricField::CapexUsdM => &mut self.capex_usd_m,
            MetricField::SustainingCapexUsdM => &mut self.sustaining_capex_usd_m,
            MetricField::PostTaxNpvUsdM => &mut self.post_tax_npv_usd_m,
            MetricField::PreTaxNpvUsdM => &mut self.pre_tax_npv_usd_m,
            MetricField::IrrPercent => &mut self.irr_percent,
            MetricField::PreTaxIrrPercent => &mut self.pre_tax_irr_percent,
            MetricField::PaybackYears => &mut self.payback_years,
            MetricField::MineLifeYears => &mut self.mine_life_years,
            MetricField::AnnualProductionTonnes => &mut self.annual_production_tonnes,
            MetricField::TotalResourceTonnes => &mut self.total_resource_tonnes,
            MetricField::TotalReserveTonnes => &mut self.total_reserve_tonnes,
            MetricField::ResourceGrade => &mut self.resource_grade,
            MetricField::OpexUsdPerTonne => &mut self.opex_usd_per_tonne,
            MetricField::AiscUsdPerTonne => &mut self.aisc_usd_per_tonne,
        }
    }

    /// Store a value if it is positive and below the field's ceiling.
    /// Returns false (leaving the field untouched) otherwise.
    ///
    /// Grades must go through [`set_grade`](Self::set_grade) so the unit is kept.
    pub fn set(&mut self, field: MetricField, value: f64) -> bool {
        if field == MetricField::ResourceGrade || !in_range(value, field.ceiling()) {
            return false;
        }
        *self.slot(field) = Some(value);
        true
    }

    /// Store a grade together with the unit it was reported in.
    pub fn set_grade(&mut self, value: f64, unit: GradeUnit) -> bool {
        if !in_range(value, unit.ceiling()) {
            return false;
        }
        self.resource_grade = Some(value);
        self.resource_grade_unit = Some(unit);
        true
    }

    /// Number of checklist fields that are populated.
    pub fn found_count(&self) -> usize {
        CHECKLIST
            .iter()
            .filter(|field| self.get(**field).is_some())
            .count()
    }

    /// Names of the populated checklist fields.
    pub fn found_fields(&self) -> Vec<&'static str> {
        CHECKLIST
            .iter()
            .filter(|field| self.get(**field).is_some())
            .map(|field| field.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.found_count() == 0
    }

    /// Fill fields that are absent here from `other`; present fields win.
    pub fn fill_missing_from(&mut self, other: &ExtractedMetrics) {
        for field in CHECKLIST {
            if field == MetricField::ResourceGrade {
                continue;
            }
            if self.get(field).is_none() {
                if let Some(value) = other.get(field) {
                    self.set(field, value);
                }
            }
        }
        if self.resource_grade.is_none() {
            if let (Some(value), Some(unit)) = (other.resource_grade, other.resource_grade_unit) {
                self.set_grade(value, unit);
            }
        }
    }
}
