//! Database layer for Drivetrain

mod connection;
mod migrations;
mod record_repository;
mod visit_repository;

use chrono::{DateTime, Utc};

pub use connection::Database;
pub use record_repository::{SqliteSyncRecordRepository, SyncRecordRepository};
pub use visit_repository::{SiteVisitRepository, SqliteSiteVisitRepository};

/// Convert a stored Unix-millisecond column back into a timestamp.
fn millis_to_datetime(column: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, millis))
}
