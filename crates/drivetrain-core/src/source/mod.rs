//! Document source: folder listings and raw content from an external drive.

mod drive;
mod google_auth;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::Result;

pub use drive::GoogleDriveSource;
pub use google_auth::{ServiceAccountCredentials, ServiceAccountTokenProvider};

pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// MIME prefix of provider-native documents that have no byte representation.
const NATIVE_DOCUMENT_MIME_PREFIX: &str = "application/vnd.google-apps";

/// A folder entry exactly as the source reported it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEntry {
    pub id: Option<String>,
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub modified_time: Option<String>,
}

impl SourceEntry {
    /// Validate the entry; `None` when identity, name or timestamp is missing or unparsable.
    pub fn into_document(self) -> Option<SourceDocument> {
        let id = self.id.filter(|id| !id.trim().is_empty())?;
        let name = self.name.filter(|name| !name.trim().is_empty())?;
        let modified_time = DateTime::parse_from_rfc3339(self.modified_time?.trim())
            .ok()?
            .with_timezone(&Utc);
        Some(SourceDocument {
            id,
            name,
            mime_type: self.mime_type.unwrap_or_default(),
            modified_time,
        })
    }
}

/// A well-formed source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub modified_time: DateTime<Utc>,
}

impl SourceDocument {
    /// Provider-native documents must be exported rather than downloaded.
    pub fn is_native_document(&self) -> bool {
        self.mime_type.starts_with(NATIVE_DOCUMENT_MIME_PREFIX)
    }
}

/// Lists folder contents and fetches document bytes.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Every non-trashed entry directly inside `folder_id`.
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<SourceEntry>>;

    /// Raw bytes of a stored file.
    async fn download(&self, document_id: &str) -> Result<Vec<u8>>;

    /// Plain-text export of a provider-native document.
    async fn export_plain_text(&self, document_id: &str) -> Result<Vec<u8>>;
}
