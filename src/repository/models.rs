//! Diesel row types and their conversions to domain models.

use chrono::NaiveDate;
use diesel::prelude::*;

use super::parse_datetime;
use crate::models::{
    Commodity, DataSource, ExtractedMetrics, GradeUnit, ProcessingStatus, Project, ProjectStage,
};
use crate::schema::{ingested_filings, projects};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = projects)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProjectRecord {
    pub id: i64,
    pub project_name: String,
    pub company_name: String,
    pub company_identifier: Option<String>,
    pub country: Option<String>,
    pub jurisdiction: Option<String>,
    pub commodity: String,
    pub stage: String,
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
    pub technical_report_url: String,
    pub technical_report_date: Option<String>,
    pub data_source: String,
    pub extraction_confidence: f64,
    pub processing_status: String,
    pub last_scraped_at: String,
    pub created_at: String,
}

impl From<ProjectRecord> for Project {
    fn from(record: ProjectRecord) -> Self {
        Project {
            id: Some(record.id),
            project_name: record.project_name,
            company_name: record.company_name,
            company_identifier: record.company_identifier,
            country: record.country,
            jurisdiction: record.jurisdiction,
            commodity: Commodity::from_str(&record.commodity).unwrap_or(Commodity::Other),
            stage: Some(ProjectStage::from_str(&record.stage).unwrap_or(ProjectStage::Exploration)),
            description: record.description,
            metrics: ExtractedMetrics {
                capex_usd_m: record.capex_usd_m,
                sustaining_capex_usd_m: record.sustaining_capex_usd_m,
                post_tax_npv_usd_m: record.post_tax_npv_usd_m,
                pre_tax_npv_usd_m: record.pre_tax_npv_usd_m,
                irr_percent: record.irr_percent,
                pre_tax_irr_percent: record.pre_tax_irr_percent,
                payback_years: record.payback_years,
                mine_life_years: record.mine_life_years,
                annual_production_tonnes: record.annual_production_tonnes,
                total_resource_tonnes: record.total_resource_tonnes,
                total_reserve_tonnes: record.total_reserve_tonnes,
                resource_grade: record.resource_grade,
                resource_grade_unit: record
                    .resource_grade_unit
                    .as_deref()
                    .and_then(GradeUnit::from_str),
                opex_usd_per_tonne: record.opex_usd_per_tonne,
                aisc_usd_per_tonne: record.aisc_usd_per_tonne,
            },
            technical_report_url: record.technical_report_url,
            technical_report_date: record
                .technical_report_date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok()),
            data_source: DataSource::from_str(&record.data_source).unwrap_or(DataSource::Manual),
            extraction_confidence: record.extraction_confidence,
            processing_status: ProcessingStatus::from_str(&record.processing_status)
                .unwrap_or(ProcessingStatus::Extracted),
            last_scraped_at: parse_datetime(&record.last_scraped_at),
        }
    }
}

/// Insert side of the upsert: every column of a new row.
#[derive(Insertable, Debug)]
#[diesel(table_name = projects)]
pub struct NewProject {
    pub project_name: String,
    pub company_name: String,
    pub company_identifier: Option<String>,
    pub country: Option<String>,
    pub jurisdiction: Option<String>,
    pub commodity: String,
    pub stage: String,
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
    pub technical_report_url: String,
    pub technical_report_date: Option<String>,
    pub data_source: String,
    pub extraction_confidence: f64,
    pub processing_status: String,
    pub last_scraped_at: String,
    pub created_at: String,
}

/// Update side of the upsert. `None` fields are left out of the `SET`
/// clause, so an omitted value never nulls a stored one.
#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = projects)]
pub struct ProjectChangeset {
    pub company_identifier: Option<String>,
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
    // Provenance: always written, a missing report date included.
    pub technical_report_url: String,
    pub technical_report_date: Option<Option<String>>,
    pub data_source: String,
    pub extraction_confidence: f64,
    pub processing_status: String,
    pub last_scraped_at: String,
}

impl NewProject {
    pub fn from_project(project: &Project, created_at: &str) -> Self {
        let m = &project.metrics;
        Self {
            project_name: project.project_name.clone(),
            company_name: project.company_name.clone(),
            company_identifier: project.company_identifier.clone(),
            country: project.country.clone(),
            jurisdiction: project.jurisdiction.clone(),
            commodity: project.commodity.as_str().to_string(),
            stage: project
                .stage
                .unwrap_or(ProjectStage::Exploration)
                .as_str()
                .to_string(),
            description: project.description.clone(),
            capex_usd_m: m.capex_usd_m,
            sustaining_capex_usd_m: m.sustaining_capex_usd_m,
            post_tax_npv_usd_m: m.post_tax_npv_usd_m,
            pre_tax_npv_usd_m: m.pre_tax_npv_usd_m,
            irr_percent: m.irr_percent,
            pre_tax_irr_percent: m.pre_tax_irr_percent,
            payback_years: m.payback_years,
            mine_life_years: m.mine_life_years,
            annual_production_tonnes: m.annual_production_tonnes,
            total_resource_tonnes: m.total_resource_tonnes,
            total_reserve_tonnes: m.total_reserve_tonnes,
            resource_grade: m.resource_grade,
            resource_grade_unit: m.resource_grade_unit.map(|u| u.as_str().to_string()),
            opex_usd_per_tonne: m.opex_usd_per_tonne,
            aisc_usd_per_tonne: m.aisc_usd_per_tonne,
            technical_report_url: project.technical_report_url.clone(),
            technical_report_date: project
                .technical_report_date
                .map(|d| d.format(DATE_FORMAT).to_string()),
            data_source: project.data_source.as_str().to_string(),
            extraction_confidence: project.extraction_confidence,
            processing_status: project.processing_status.as_str().to_string(),
            last_scraped_at: project.last_scraped_at.to_rfc3339(),
            created_at: created_at.to_string(),
        }
    }
}

impl ProjectChangeset {
    pub fn from_project(project: &Project) -> Self {
        let m = &project.metrics;
        // Grade and unit travel together.
        let (resource_grade, resource_grade_unit) = match (m.resource_grade, m.resource_grade_unit)
        {
            (Some(grade), Some(unit)) => (Some(grade), Some(unit.as_str().to_string())),
            _ => (None, None),
        };
        Self {
            company_identifier: project.company_identifier.clone(),
            country: project.country.clone(),
            jurisdiction: project.jurisdiction.clone(),
            // The commodity fallback means "not detected".
            commodity: (project.commodity != Commodity::Other)
                .then(|| project.commodity.as_str().to_string()),
            stage: project.stage.map(|s| s.as_str().to_string()),
            description: project.description.clone(),
            capex_usd_m: m.capex_usd_m,
            sustaining_capex_usd_m: m.sustaining_capex_usd_m,
            post_tax_npv_usd_m: m.post_tax_npv_usd_m,
            pre_tax_npv_usd_m: m.pre_tax_npv_usd_m,
            irr_percent: m.irr_percent,
            pre_tax_irr_percent: m.pre_tax_irr_percent,
            payback_years: m.payback_years,
            mine_life_years: m.mine_life_years,
            annual_production_tonnes: m.annual_production_tonnes,
            total_resource_tonnes: m.total_resource_tonnes,
            total_reserve_tonnes: m.total_reserve_tonnes,
            resource_grade,
            resource_grade_unit,
            opex_usd_per_tonne: m.opex_usd_per_tonne,
            aisc_usd_per_tonne: m.aisc_usd_per_tonne,
            technical_report_url: project.technical_report_url.clone(),
            technical_report_date: Some(
                project
                    .technical_report_date
                    .map(|d| d.format(DATE_FORMAT).to_string()),
            ),
            data_source: project.data_source.as_str().to_string(),
            extraction_confidence: project.extraction_confidence,
            processing_status: project.processing_status.as_str().to_string(),
            last_scraped_at: project.last_scraped_at.to_rfc3339(),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = ingested_filings)]
#[diesel(primary_key(accession_number))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct IngestedFilingRecord {
    pub accession_number: String,
    pub source: String,
    pub company_name: String,
    pub form_type: String,
    pub document_url: String,
    pub outcome: String,
    pub project_id: Option<i64>,
    pub extraction_confidence: Option<f64>,
    pub ingested_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = ingested_filings)]
pub struct NewIngestedFiling<'a> {
    pub accession_number: &'a str,
    pub source: &'a str,
    pub company_name: &'a str,
    pub form_type: &'a str,
    pub document_url: &'a str,
    pub outcome: &'a str,
    pub project_id: Option<i64>,
    pub extraction_confidence: Option<f64>,
    pub ingested_at: &'a str,
}
