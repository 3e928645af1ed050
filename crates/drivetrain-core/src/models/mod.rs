//! Data models for Drivetrain

mod site_visit;
mod sync_record;

pub use site_visit::{Enrichment, SiteVisit, VisitId};
pub use sync_record::{normalize_display_name, DocumentError, SyncRecord, SyncSummary};
