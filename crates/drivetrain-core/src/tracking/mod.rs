//! Learning tracker: aggregates per-day time on site and enriches new domains.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::SiteVisitRepository;
use crate::models::{Enrichment, SiteVisit, VisitId};
use crate::services::StoreHandle;
use crate::util::{normalize_text_option, sanitize, truncate_chars};
use crate::{Error, Result};

/// User recorded when a report names none.
pub const DEFAULT_USER: &str = "user1";

/// Characters of page content sent for enrichment.
pub const ENRICHMENT_CONTENT_LIMIT: usize = 4000;

/// Upper bound on the seconds a single report may add.
pub const MAX_REPORTED_SECONDS: f64 = 86_400.0;

/// Domains whose visits are never recorded.
pub const BLOCKED_DOMAINS: &[&str] = &[
    "google.com",
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "tiktok.com",
    "amazon.com",
    "paypal.com",
    "bankofamerica.com",
];

/// Derives learning metadata from page text.
#[async_trait]
pub trait PageEnricher: Send + Sync {
    async fn enrich(&self, page_content: &str) -> Result<Enrichment>;
}

/// A visit report as sent by the browser extension.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitReport {
    pub user: Option<String>,
    pub url: Option<String>,
    pub root_domain: Option<String>,
    pub accessed_at: Option<DateTime<Utc>>,
    /// Seconds; fractional values are rounded
    pub time_on_site: Option<f64>,
    pub raw_title: Option<String>,
    pub page_content: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct ValidReport {
    user: String,
    url: String,
    root_domain: String,
    accessed_at: DateTime<Utc>,
    time_on_site: i64,
    raw_title: String,
    page_content: String,
}

impl VisitReport {
    fn validate(self, now: DateTime<Utc>) -> Result<ValidReport> {
        let url = normalize_text_option(self.url).ok_or_else(|| missing("url"))?;
        let root_domain =
            normalize_text_option(self.root_domain).ok_or_else(|| missing("rootDomain"))?;
        let time_on_site = self.time_on_site.ok_or_else(|| missing("timeOnSite"))?;
        let raw_title = normalize_text_option(self.raw_title).ok_or_else(|| missing("rawTitle"))?;

        if !time_on_site.is_finite() || time_on_site < 0.0 {
            return Err(Error::InvalidInput(
                "timeOnSite must be a non-negative number".to_string(),
            ));
        }
        if time_on_site > MAX_REPORTED_SECONDS {
            return Err(Error::InvalidInput(format!(
                "timeOnSite must be at most {MAX_REPORTED_SECONDS} seconds"
            )));
        }

        #[allow(clippy::cast_possible_truncation)]
        let time_on_site = time_on_site.round() as i64;

        Ok(ValidReport {
            user: normalize_text_option(self.user).unwrap_or_else(|| DEFAULT_USER.to_string()),
            url,
            root_domain,
            accessed_at: self.accessed_at.unwrap_or(now),
            time_on_site,
            raw_title,
            page_content: self.page_content.unwrap_or_default(),
        })
    }
}

fn missing(field: &str) -> Error {
    Error::InvalidInput(format!("Missing {field}"))
}

/// What ingesting a report did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Blocked domain; nothing stored
    Ignored,
    /// Added time to today's visit
    Updated(SiteVisit),
    /// Started a new visit
    Created(SiteVisit),
}

/// Total time a user spent on a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainSummary {
    pub root_domain: String,
    pub total_time: i64,
    pub last_visit: Option<DateTime<Utc>>,
}

/// Whether the root domain contains any blocked domain.
pub fn is_blocked(root_domain: &str) -> bool {
    BLOCKED_DOMAINS
        .iter()
        .any(|domain| root_domain.contains(domain))
}

/// Midnight UTC of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

#[derive(Clone)]
pub struct LearningTracker {
    store: StoreHandle,
    enricher: Arc<dyn PageEnricher>,
}

impl LearningTracker {
    pub fn new(store: StoreHandle, enricher: Arc<dyn PageEnricher>) -> Self {
        Self { store, enricher }
    }

    /// Record a visit report observed at `now`.
    pub async fn ingest(&self, report: VisitReport, now: DateTime<Utc>) -> Result<IngestOutcome> {
        let report = report.validate(now)?;

        if is_blocked(&report.root_domain) {
            tracing::info!(root_domain = %report.root_domain, "Skipping blocked site");
            return Ok(IngestOutcome::Ignored);
        }

        let today = start_of_day(now);
        let existing = self
            .store
            .with_visits(|visits| visits.find_since(&report.user, &report.root_domain, today))
            .await?;

        if let Some(mut visit) = existing {
            visit.time_on_site = visit.time_on_site.saturating_add(report.time_on_site);
            visit.accessed_at = report.accessed_at;
            self.store.with_visits(|visits| visits.save(&visit)).await?;
            tracing::info!(
                root_domain = %visit.root_domain,
                time_on_site = visit.time_on_site,
                "Updated existing visit"
            );
            return Ok(IngestOutcome::Updated(visit));
        }

        let enrichment = self.enrichment_for(&report).await?;
        let visit = SiteVisit {
            id: VisitId::new(),
            user: report.user,
            url: report.url,
            root_domain: report.root_domain,
            accessed_at: report.accessed_at,
            time_on_site: report.time_on_site,
            raw_title: report.raw_title,
            enrichment,
        };
        self.store.with_visits(|visits| visits.save(&visit)).await?;
        tracing::info!(
            root_domain = %visit.root_domain,
            time_on_site = visit.time_on_site,
            "Created new visit"
        );
        Ok(IngestOutcome::Created(visit))
    }

    async fn enrichment_for(&self, report: &ValidReport) -> Result<Enrichment> {
        let cached = self
            .store
            .with_visits(|visits| visits.latest_enriched(&report.root_domain))
            .await?;
        if let Some(previous) = cached {
            tracing::info!(root_domain = %report.root_domain, "Reusing enrichment");
            return Ok(previous.enrichment);
        }

        let content = truncate_chars(report.page_content.trim(), ENRICHMENT_CONTENT_LIMIT);
        if content.is_empty() {
            return Ok(Enrichment::default());
        }

        tracing::info!(root_domain = %report.root_domain, "Enriching page content");
        match self.enricher.enrich(content).await {
            Ok(enrichment) => Ok(enrichment),
            Err(error) => {
                tracing::warn!(
                    root_domain = %report.root_domain,
                    error = %sanitize(&error),
                    "Enrichment failed; storing visit without it"
                );
                Ok(Enrichment::default())
            }
        }
    }

    /// Aggregate time and last visit for `user` on `root_domain`.
    pub async fn summary(&self, user: &str, root_domain: &str) -> Result<DomainSummary> {
        let visits = self
            .store
            .with_visits(|visits| visits.list_for_domain(user, root_domain))
            .await?;
        Ok(DomainSummary {
            root_domain: root_domain.to_string(),
            total_time: visits
                .iter()
                .fold(0_i64, |total, visit| total.saturating_add(visit.time_on_site)),
            last_visit: visits.first().map(|visit| visit.accessed_at),
        })
    }
}
