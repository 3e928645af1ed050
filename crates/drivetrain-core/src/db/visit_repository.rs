//! Site visit repository implementation

use crate::error::{Error, Result};
use crate::models::{Enrichment, SiteVisit, VisitId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::millis_to_datetime;

/// Trait for learning tracker storage operations
pub trait SiteVisitRepository {
    /// Most recent visit by `user` to `root_domain` accessed at or after `since`
    fn find_since(
        &self,
        user: &str,
        root_domain: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<SiteVisit>>;

    /// Most recent visit to `root_domain` (any user) carrying usable enrichment
    fn latest_enriched(&self, root_domain: &str) -> Result<Option<SiteVisit>>;

    /// Insert the visit, or overwrite it when the id already exists
    fn save(&self, visit: &SiteVisit) -> Result<()>;

    /// All visits by `user` to `root_domain`, newest first
    fn list_for_domain(&self, user: &str, root_domain: &str) -> Result<Vec<SiteVisit>>;
}

/// `SQLite` implementation of `SiteVisitRepository`
pub struct SqliteSiteVisitRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSiteVisitRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_visit(row: &rusqlite::Row<'_>) -> rusqlite::Result<SiteVisit> {
        let id: String = row.get(0)?;
        let id = id.parse::<VisitId>().map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(error))
        })?;
        Ok(SiteVisit {
            id,
            user: row.get(1)?,
            url: row.get(2)?,
            root_domain: row.get(3)?,
            accessed_at: millis_to_datetime(4, row.get(4)?)?,
            time_on_site: row.get(5)?,
            raw_title: row.get(6)?,
            enrichment: Enrichment {
                title: row.get(7)?,
                description: row.get(8)?,
                subject: row.get(9)?,
                confidence: row.get(10)?,
            },
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, user_name, url, root_domain, accessed_at, time_on_site,
        raw_title, gen_title, gen_description, gen_subject, confidence
     FROM site_visits";

impl SiteVisitRepository for SqliteSiteVisitRepository<'_> {
    fn find_since(
        &self,
        user: &str,
        root_domain: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<SiteVisit>> {
        let visit = self
            .conn
            .query_row(
                &format!(
                    "{SELECT_COLUMNS}
                     WHERE user_name = ? AND root_domain = ? AND accessed_at >= ?
                     ORDER BY accessed_at DESC
                     LIMIT 1"
                ),
                params![user, root_domain, since.timestamp_millis()],
                Self::parse_visit,
            )
            .optional()?;
        Ok(visit)
    }

    fn latest_enriched(&self, root_domain: &str) -> Result<Option<SiteVisit>> {
        let visit = self
            .conn
            .query_row(
                &format!(
                    "{SELECT_COLUMNS}
                     WHERE root_domain = ? AND gen_title != '' AND gen_subject != ''
                     ORDER BY accessed_at DESC
                     LIMIT 1"
                ),
                params![root_domain],
                Self::parse_visit,
            )
            .optional()?;
        Ok(visit)
    }

    fn save(&self, visit: &SiteVisit) -> Result<()> {
        if visit.time_on_site < 0 {
            return Err(Error::InvalidInput(
                "time on site must not be negative".to_string(),
            ));
        }

        self.conn.execute(
            "INSERT INTO site_visits
                (id, user_name, url, root_domain, accessed_at, time_on_site, raw_title,
                 gen_title, gen_description, gen_subject, confidence)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                url = excluded.url,
                accessed_at = excluded.accessed_at,
                time_on_site = excluded.time_on_site,
                raw_title = excluded.raw_title,
                gen_title = excluded.gen_title,
                gen_description = excluded.gen_description,
                gen_subject = excluded.gen_subject,
                confidence = excluded.confidence",
            params![
                visit.id.as_str(),
                visit.user,
                visit.url,
                visit.root_domain,
                visit.accessed_at.timestamp_millis(),
                visit.time_on_site,
                visit.raw_title,
                visit.enrichment.title,
                visit.enrichment.description,
                visit.enrichment.subject,
                visit.enrichment.confidence,
            ],
        )?;
        Ok(())
    }

    fn list_for_domain(&self, user: &str, root_domain: &str) -> Result<Vec<SiteVisit>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_COLUMNS}
             WHERE user_name = ? AND root_domain = ?
             ORDER BY accessed_at DESC"
        ))?;
        let visits = stmt
            .query_map(params![user, root_domain], Self::parse_visit)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(visits)
    }
}
