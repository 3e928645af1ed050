//! Google Drive v3 implementation of `DocumentSource`.

use async_trait::async_trait;
use serde::Deserialize;

use super::{DocumentSource, ServiceAccountTokenProvider, SourceEntry};
use crate::util::compact_text;
use crate::{Error, Result};

const SERVICE: &str = "Google Drive";
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, modifiedTime)";
const PAGE_SIZE: &str = "1000";

/// Drive REST client authenticated as a service account.
#[derive(Clone)]
pub struct GoogleDriveSource {
    client: reqwest::Client,
    api_base: String,
    tokens: ServiceAccountTokenProvider,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    #[serde(default)]
    files: Vec<SourceEntry>,
    next_page_token: Option<String>,
}

impl GoogleDriveSource {
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        tokens: ServiceAccountTokenProvider,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    async fn get_bytes(&self, url: &str, query: &[(&str, &str)]) -> Result<Vec<u8>> {
        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl DocumentSource for GoogleDriveSource {
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<SourceEntry>> {
        let query = folder_query(folder_id);
        let url = format!("{}/files", self.api_base);
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let token = self.tokens.access_token().await?;
            let mut request = self.client.get(&url).bearer_auth(token).query(&[
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", PAGE_SIZE),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ]);
            if let Some(page_token) = page_token.as_deref() {
                request = request.query(&[("pageToken", page_token)]);
            }

            let response = check_status(request.send().await?).await?;
            let page = response.json::<FileListResponse>().await?;
            entries.extend(page.files);

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        tracing::info!(folder_id, count = entries.len(), "Listed source folder");
        Ok(entries)
    }

    async fn download(&self, document_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/files/{}", self.api_base, document_id);
        self.get_bytes(&url, &[("alt", "media"), ("supportsAllDrives", "true")])
            .await
    }

    async fn export_plain_text(&self, document_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/files/{}/export", self.api_base, document_id);
        self.get_bytes(&url, &[("mimeType", "text/plain")]).await
    }
}

/// Drive search expression for the direct, non-trashed children of a folder.
fn folder_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}' in parents and trashed = false")
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(Error::NotFound(format!("{SERVICE}: {}", compact_text(&body))));
    }
    Err(Error::upstream(
        SERVICE,
        format!("HTTP {}: {}", status.as_u16(), compact_text(&body)),
    ))
}
