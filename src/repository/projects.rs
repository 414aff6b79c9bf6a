//! Project persistence keyed by `(project_name, company_name)`.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::debug;

use super::models::{NewProject, ProjectChangeset, ProjectRecord};
use super::pool::{DbError, SqlitePool};
use crate::models::Project;
use crate::schema::projects;

/// Result of one upsert.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    /// The row as stored after the write.
    Written(Project),
    /// Skipped: the stored row has a higher confidence.
    ProtectedHigherConfidence { stored_confidence: f64 },
}

/// Where accepted projects go.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Insert or update by natural key. Fields absent from `project` keep
    /// their stored values; provenance is always refreshed. With
    /// `protect_higher_confidence`, a lower-confidence write is skipped.
    async fn upsert(
        &self,
        project: &Project,
        protect_higher_confidence: bool,
    ) -> Result<UpsertOutcome, DbError>;
}

/// Diesel-backed project repository.
#[derive(Clone)]
pub struct DieselProjectRepository {
    pool: SqlitePool,
}

impl DieselProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a project by its natural key.
    pub async fn get_by_key(
        &self,
        project_name: &str,
        company_name: &str,
    ) -> Result<Option<Project>, DbError> {
        let mut conn = self.pool.get().await?;

        projects::table
            .filter(projects::project_name.eq(project_name))
            .filter(projects::company_name.eq(company_name))
            .select(ProjectRecord::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Project::from))
    }

    pub async fn count(&self) -> Result<i64, DbError> {
        let mut conn = self.pool.get().await?;

        projects::table.count().get_result(&mut conn).await
    }
}

#[async_trait]
impl ProjectStore for DieselProjectRepository {
    async fn upsert(
        &self,
        project: &Project,
        protect_higher_confidence: bool,
    ) -> Result<UpsertOutcome, DbError> {
        let mut conn = self.pool.get().await?;

        let created_at = Utc::now().to_rfc3339();
        let new = NewProject::from_project(project, &created_at);
        let changes = ProjectChangeset::from_project(project);

        // The confidence guard lives in the conflict clause, so the check and
        // the write are one statement.
        let (rows, record) = conn
            .transaction(|conn| {
                Box::pin(async move {
                    let upsert = diesel::insert_into(projects::table)
                        .values(&new)
                        .on_conflict((projects::project_name, projects::company_name))
                        .do_update()
                        .set(&changes);
                    let rows = if protect_higher_confidence {
                        use diesel::query_dsl::methods::FilterDsl;
                        upsert
                            .filter(
                                projects::extraction_confidence
                                    .le(excluded(projects::extraction_confidence)),
                            )
                            .execute(conn)
                            .await?
                    } else {
                        upsert.execute(conn).await?
                    };

                    let record = projects::table
                        .filter(projects::project_name.eq(&new.project_name))
                        .filter(projects::company_name.eq(&new.company_name))
                        .select(ProjectRecord::as_select())
                        .first(conn)
                        .await?;
                    Ok::<_, DbError>((rows, record))
                })
            })
            .await?;

        if rows == 0 {
            return Ok(UpsertOutcome::ProtectedHigherConfidence {
                stored_confidence: record.extraction_confidence,
            });
        }

        debug!(
            "Upserted project {} / {} (id {})",
            record.project_name, record.company_name, record.id
        );
        Ok(UpsertOutcome::Written(Project::from(record)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Commodity, DataSource, ExtractedMetrics, GradeUnit, ProcessingStatus, ProjectStage,
    };
    use crate::repository::run_migrations;
    use chrono::{Duration, NaiveDate};
    use tempfile::tempdir;

    async fn setup_test_db() -> (DieselProjectRepository, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_url = format!("sqlite:{}", dir.path().join("test.db").display());
        run_migrations(&db_url).await.unwrap();
        (DieselProjectRepository::new(SqlitePool::new(&db_url)), dir)
    }

    fn project(confidence: f64) -> Project {
        Project {
            id: None,
            project_name: "Salar Verde Lithium Project".to_string(),
            company_name: "Verde Lithium Corp".to_string(),
            company_identifier: Some("0001440972".to_string()),
            country: Some("United States".to_string()),
            jurisdiction: Some("Nevada".to_string()),
            commodity: Commodity::Lithium,
            stage: Some(ProjectStage::Feasibility),
            description: Some("Brine project".to_string()),
            metrics: ExtractedMetrics {
                capex_usd_m: Some(1070.0),
                irr_percent: Some(25.1),
                resource_grade: Some(0.23),
                resource_grade_unit: Some(GradeUnit::Percent),
                ..Default::default()
            },
            technical_report_url: "https://example.com/first.htm".to_string(),
            technical_report_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            data_source: DataSource::EdgarSearch,
            extraction_confidence: confidence,
            processing_status: ProcessingStatus::Extracted,
            last_scraped_at: Utc::now() - Duration::days(1),
        }
    }

    #[tokio::test]
    async fn test_insert_returns_stored_row() {
        let (repo, _dir) = setup_test_db().await;

        let UpsertOutcome::Written(stored) = repo.upsert(&project(4.3), false).await.unwrap() else {
            panic!("expected a write");
        };
        assert!(stored.id.is_some());
        assert_eq!(stored.metrics.irr_percent, Some(25.1));
        assert_eq!(stored.metrics.resource_grade_unit, Some(GradeUnit::Percent));
        assert_eq!(stored.commodity, Commodity::Lithium);
        assert_eq!(stored.technical_report_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_partial_update_preserves_values() {
        let (repo, _dir) = setup_test_db().await;
        repo.upsert(&project(4.3), false).await.unwrap();

        let mut second = project(3.6);
        second.metrics = ExtractedMetrics {
            mine_life_years: Some(40.0),
            ..Default::default()
        };
        second.description = None;
        second.commodity = Commodity::Other;
        second.technical_report_url = "https://example.com/second.htm".to_string();
        second.technical_report_date = None;
        second.data_source = DataSource::EdgarCompany;

        let UpsertOutcome::Written(stored) = repo.upsert(&second, false).await.unwrap() else {
            panic!("expected a write");
        };
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(stored.metrics.capex_usd_m, Some(1070.0));
        assert_eq!(stored.metrics.irr_percent, Some(25.1));
        assert_eq!(stored.metrics.mine_life_years, Some(40.0));
        assert_eq!(stored.description.as_deref(), Some("Brine project"));
        assert_eq!(stored.commodity, Commodity::Lithium);
        assert_eq!(stored.stage, Some(ProjectStage::Feasibility));
        // Provenance follows the latest write.
        assert_eq!(stored.technical_report_url, "https://example.com/second.htm");
        assert_eq!(stored.technical_report_date, None);
        assert_eq!(stored.data_source, DataSource::EdgarCompany);
        assert_eq!(stored.extraction_confidence, 3.6);
    }

    #[tokio::test]
    async fn test_protect_higher_confidence() {
        let (repo, _dir) = setup_test_db().await;
        repo.upsert(&project(5.0), false).await.unwrap();

        let outcome = repo.upsert(&project(3.6), true).await.unwrap();
        assert_eq!(
            outcome,
            UpsertOutcome::ProtectedHigherConfidence {
                stored_confidence: 5.0
            }
        );

        let outcome = repo.upsert(&project(5.7), true).await.unwrap();
        assert!(matches!(outcome, UpsertOutcome::Written(p) if p.extraction_confidence == 5.7));

        let stored = repo
            .get_by_key("Salar Verde Lithium Project", "Verde Lithium Corp")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.extraction_confidence, 5.7);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_undetected_stage_keeps_stored_stage() {
        let (repo, _dir) = setup_test_db().await;
        repo.upsert(&project(4.3), false).await.unwrap();

        let update = crate::extract::DescriptiveFields::detect(
            "Quarterly update on lithium brine operations in Nevada.",
        );
        let mut second = project(4.3);
        second.stage = update.stage;
        second.technical_report_url = "https://example.com/update.htm".to_string();

        let UpsertOutcome::Written(stored) = repo.upsert(&second, false).await.unwrap() else {
            panic!("expected a write");
        };
        assert_eq!(stored.stage, Some(ProjectStage::Feasibility));
        assert_eq!(stored.technical_report_url, "https://example.com/update.htm");
    }

    #[tokio::test]
    async fn test_new_project_without_stage_defaults_to_exploration() {
        let (repo, _dir) = setup_test_db().await;
        let mut first = project(4.3);
        first.stage = None;

        let UpsertOutcome::Written(stored) = repo.upsert(&first, false).await.unwrap() else {
            panic!("expected a write");
        };
        assert_eq!(stored.stage, Some(ProjectStage::Exploration));
    }

    #[tokio::test]
    async fn test_concurrent_protected_writes_keep_highest_confidence() {
        let (repo, _dir) = setup_test_db().await;
        repo.upsert(&project(3.0), false).await.unwrap();

        for _ in 0..5 {
            let (low, high) = (project(4.0), project(5.0));
            let (a, b) = tokio::join!(repo.upsert(&low, true), repo.upsert(&high, true));
            a.unwrap();
            b.unwrap();

            let stored = repo
                .get_by_key("Salar Verde Lithium Project", "Verde Lithium Corp")
                .await
                .unwrap()
                .unwrap();
            assert_eq!(stored.extraction_confidence, 5.0);
        }
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
