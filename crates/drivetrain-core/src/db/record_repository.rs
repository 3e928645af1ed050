//! Sync record repository implementation

use crate::error::Result;
use crate::models::SyncRecord;
use rusqlite::{params, Connection, OptionalExtension};

use super::millis_to_datetime;

/// Trait for sync record storage operations
pub trait SyncRecordRepository {
    /// Get the record for a source document
    fn get(&self, document_id: &str) -> Result<Option<SyncRecord>>;

    /// Create the record, or replace every attribute of the existing one
    fn upsert(&self, record: &SyncRecord) -> Result<()>;

    /// List all records, oldest sync first
    fn list(&self) -> Result<Vec<SyncRecord>>;

    /// Delete every record, returning how many were removed
    fn clear(&self) -> Result<usize>;
}

/// `SQLite` implementation of `SyncRecordRepository`
pub struct SqliteSyncRecordRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSyncRecordRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a record from a database row
    fn parse_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncRecord> {
        Ok(SyncRecord {
            document_id: row.get(0)?,
            display_name: row.get(1)?,
            artifact_id: row.get(2)?,
            last_modified: millis_to_datetime(3, row.get(3)?)?,
            collection_key: row.get(4)?,
            index_id: row.get(5)?,
            synced_at: millis_to_datetime(6, row.get(6)?)?,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT document_id, display_name, artifact_id, last_modified,
        collection_key, index_id, synced_at
     FROM sync_records";

impl SyncRecordRepository for SqliteSyncRecordRepository<'_> {
    fn get(&self, document_id: &str) -> Result<Option<SyncRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE document_id = ?"),
                params![document_id],
                Self::parse_record,
            )
            .optional()?;
        Ok(record)
    }

    fn upsert(&self, record: &SyncRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_records
                (document_id, display_name, artifact_id, last_modified, collection_key, index_id, synced_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(document_id) DO UPDATE SET
                display_name = excluded.display_name,
                artifact_id = excluded.artifact_id,
                last_modified = excluded.last_modified,
                collection_key = excluded.collection_key,
                index_id = excluded.index_id,
                synced_at = excluded.synced_at",
            params![
                record.document_id,
                record.display_name,
                record.artifact_id,
                record.last_modified.timestamp_millis(),
                record.collection_key,
                record.index_id,
                record.synced_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<SyncRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY synced_at ASC"))?;
        let records = stmt
            .query_map([], Self::parse_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn clear(&self) -> Result<usize> {
        let removed = self.conn.execute("DELETE FROM sync_records", [])?;
        Ok(removed)
    }
}
