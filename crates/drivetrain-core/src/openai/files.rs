//! `ArtifactStore` over the OpenAI Files API.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::{check_status, OpenAiClient};
use crate::artifacts::ArtifactStore;
use crate::poll::{poll_until, PollError, PollStatus};
use crate::{Error, Result};

const FILE_PURPOSE: &str = "assistants";

#[derive(Debug, Deserialize)]
struct FileObject {
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    status_details: Option<String>,
}

/// Map a Files API status onto a poll outcome.
fn processing_status(file: &FileObject) -> PollStatus<()> {
    match file.status.as_deref() {
        Some("processed") => PollStatus::Ready(()),
        Some("error") => PollStatus::Failed(
            file.status_details
                .clone()
                .unwrap_or_else(|| "error".to_string()),
        ),
        _ => PollStatus::Pending,
    }
}

impl OpenAiClient {
    async fn fetch_file(&self, file_id: &str) -> Result<FileObject> {
        let response = self.get_request(&format!("files/{file_id}")).send().await?;
        let response = check_status(response, "Retrieve file").await?;
        Ok(response.json::<FileObject>().await?)
    }

    /// Wait until the uploaded file reports `processed`.
    pub async fn wait_for_file_processed(&self, file_id: &str) -> Result<()> {
        let policy = self.processing_poll;
        let outcome = poll_until(policy, |attempt| async move {
            let file = self.fetch_file(file_id).await?;
            tracing::debug!(
                file_id,
                attempt,
                status = file.status.as_deref().unwrap_or("unknown"),
                "Polled file status"
            );
            Ok::<_, Error>(processing_status(&file))
        })
        .await;

        match outcome {
            Ok(()) => Ok(()),
            Err(PollError::Failed(reason)) => {
                tracing::warn!(file_id, reason = %reason, "File failed to process");
                Err(Error::ArtifactFailed(file_id.to_string()))
            }
            Err(PollError::TimedOut { attempts }) => Err(Error::Timeout(format!(
                "file {file_id} was not processed after {attempts} checks ({:?})",
                policy.timeout
            ))),
            Err(PollError::Probe(error)) => Err(error),
        }
    }
}

#[async_trait]
impl ArtifactStore for OpenAiClient {
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<String> {
        let size = bytes.len();
        let form = Form::new()
            .text("purpose", FILE_PURPOSE)
            .part("file", Part::bytes(bytes).file_name(name.to_string()));

        let response = self.post_request("files").multipart(form).send().await?;
        let response = check_status(response, "Upload file").await?;
        let file = response.json::<FileObject>().await?;
        tracing::info!(file_id = %file.id, name, size, "Uploaded file, waiting for processing");

        self.wait_for_file_processed(&file.id).await?;
        Ok(file.id)
    }

    async fn delete(&self, artifact_id: &str) -> Result<()> {
        let response = self.delete_request(&format!("files/{artifact_id}")).send().await?;
        check_status(response, "Delete file").await?;
        tracing::info!(file_id = artifact_id, "Deleted file");
        Ok(())
    }
}
