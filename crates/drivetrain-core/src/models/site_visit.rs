//! Site visit model for the learning tracker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for a visit, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisitId(Uuid);

impl VisitId {
    /// Create a new unique visit ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for VisitId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VisitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VisitId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Generated learning metadata for a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub title: String,
    pub description: String,
    pub subject: String,
    pub confidence: String,
}

impl Enrichment {
    /// Enrichment is reusable only when it names both a title and a subject.
    pub fn is_usable(&self) -> bool {
        !self.title.is_empty() && !self.subject.is_empty()
    }
}

/// Aggregated time a user spent on one root domain during one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteVisit {
    pub id: VisitId,
    pub user: String,
    pub url: String,
    pub root_domain: String,
    pub accessed_at: DateTime<Utc>,
    /// Accumulated seconds on site
    pub time_on_site: i64,
    pub raw_title: String,
    pub enrichment: Enrichment,
}
