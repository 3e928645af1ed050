//! Sync record model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Suffix appended to source names that carry no extension.
const DEFAULT_EXTENSION: &str = ".txt";

/// Sync metadata for one source document that has been uploaded at least once.
///
/// `document_id` is the unique key; a record is only written after the artifact
/// has been uploaded, processed and attached to `index_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    /// Identifier of the document in the source system
    pub document_id: String,
    /// Stored file name (extension normalized)
    pub display_name: String,
    /// Identifier returned by the artifact store
    pub artifact_id: Option<String>,
    /// Source modification time at last successful sync
    pub last_modified: DateTime<Utc>,
    /// Logical grouping, e.g. a department key
    pub collection_key: String,
    /// Index collection the artifact is attached to
    pub index_id: String,
    /// Time of last successful upload
    pub synced_at: DateTime<Utc>,
}

impl SyncRecord {
    /// Whether the record already reflects the given source modification time.
    ///
    /// Compared at millisecond precision, the resolution the store keeps.
    pub fn is_current(&self, source_modified: DateTime<Utc>) -> bool {
        self.last_modified.timestamp_millis() == source_modified.timestamp_millis()
    }
}

/// Append the default extension when the name has no `.` in it.
pub fn normalize_display_name(name: &str) -> String {
    if name.contains('.') {
        name.to_string()
    } else {
        format!("{name}{DEFAULT_EXTENSION}")
    }
}

/// A per-document failure collected during a reconcile pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentError {
    pub document_id: String,
    pub message: String,
}

/// Outcome of one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub processed: usize,
    pub skipped: usize,
    pub errors: Vec<DocumentError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn normalize_display_name_appends_txt() {
        assert_eq!(normalize_display_name("Notes"), "Notes.txt");
    }

    #[test]
    fn normalize_display_name_keeps_existing_extension() {
        assert_eq!(normalize_display_name("Notes.pdf"), "Notes.pdf");
        assert_eq!(normalize_display_name("v1.2 roadmap"), "v1.2 roadmap");
    }

    #[test]
    fn is_current_ignores_sub_millisecond_noise() {
        let base = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let record = SyncRecord {
            document_id: "doc".to_string(),
            display_name: "doc.txt".to_string(),
            artifact_id: Some("file-1".to_string()),
            last_modified: base,
            collection_key: "hr".to_string(),
            index_id: "vs_1".to_string(),
            synced_at: base,
        };

        assert!(record.is_current(base + chrono::Duration::microseconds(400)));
        assert!(!record.is_current(base + chrono::Duration::seconds(1)));
    }
}
