//! Database migrations

use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get::<_, i32>(0),
        )
        .optional()?
        .unwrap_or(0);

    Ok(version)
}

/// Migration to version 1: sync records
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS sync_records (
            document_id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            artifact_id TEXT,
            last_modified INTEGER NOT NULL,
            collection_key TEXT NOT NULL,
            index_id TEXT NOT NULL,
            synced_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sync_records_collection
            ON sync_records(collection_key);
        INSERT INTO schema_version (version) VALUES (1);
        COMMIT;",
    )?;

    tracing::debug!("Applied migration v1 (sync_records)");
    Ok(())
}

/// Migration to version 2: learning tracker visits
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS site_visits (
            id TEXT PRIMARY KEY,
            user_name TEXT NOT NULL,
            url TEXT NOT NULL,
            root_domain TEXT NOT NULL,
            accessed_at INTEGER NOT NULL,
            time_on_site INTEGER NOT NULL,
            raw_title TEXT NOT NULL DEFAULT '',
            gen_title TEXT NOT NULL DEFAULT '',
            gen_description TEXT NOT NULL DEFAULT '',
            gen_subject TEXT NOT NULL DEFAULT '',
            confidence TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_site_visits_user_domain
            ON site_visits(user_name, root_domain, accessed_at DESC);",
    )?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        params![CURRENT_VERSION],
    )?;
    conn.execute_batch("COMMIT;")?;

    tracing::debug!("Applied migration v2 (site_visits)");
    Ok(())
}
