//! Database migrations using diesel_migrations.
//!
//! Embeds migrations at compile time and runs them via blocking tasks
//! to work with async connections.

use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

use super::pool::{sqlite_path, to_diesel_error, DbError};

pub const SQLITE_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");

/// Run pending migrations, creating the database file (and its directory) if needed.
pub async fn run_migrations(database_url: &str) -> Result<usize, DbError> {
    let path = sqlite_path(database_url).to_string();

    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() && path != ":memory:" {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(to_diesel_error)?;
        }
    }

    tokio::task::spawn_blocking(move || {
        let mut conn = diesel::SqliteConnection::establish(&path).map_err(to_diesel_error)?;

        let migrations = conn
            .run_pending_migrations(SQLITE_MIGRATIONS)
            .map_err(DbError::QueryBuilderError)?;

        for migration in &migrations {
            info!("Applied migration: {}", migration);
        }
        if migrations.is_empty() {
            info!("No pending migrations");
        }
        Ok(migrations.len())
    })
    .await
    .map_err(|e| DbError::QueryBuilderError(Box::new(e)))?
}
