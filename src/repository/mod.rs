//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM over SQLite, made async with
//! diesel-async's `SyncConnectionWrapper`.

pub mod filings;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod projects;

pub use filings::{DieselFilingRepository, LedgerOutcome};
pub use migrations::run_migrations;
pub use pool::{DbError, SqlitePool};
pub use projects::{DieselProjectRepository, ProjectStore, UpsertOutcome};

use chrono::{DateTime, Utc};

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}
