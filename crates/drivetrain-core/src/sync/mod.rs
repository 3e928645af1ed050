//! Reconciles an index collection with the current contents of a source folder.
//!
//! Each changed document is a small saga: retire the stale artifact (detach,
//! then delete), fetch, upload and wait for processing, attach, then upsert
//! the record. The record is written last, so a document that fails at any
//! step keeps its previous record and is retried from the start next run.

use std::sync::Arc;

use chrono::Utc;

use crate::artifacts::{ArtifactStore, IndexAttachment};
use crate::db::SyncRecordRepository;
use crate::models::{normalize_display_name, DocumentError, SyncRecord, SyncSummary};
use crate::services::StoreHandle;
use crate::source::{DocumentSource, SourceDocument};
use crate::util::sanitize;
use crate::{Error, Result};

/// Which folder feeds which index, under which collection key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileTarget {
    pub collection_key: String,
    pub folder_id: String,
    pub index_id: String,
}

#[derive(Clone)]
pub struct Reconciler {
    source: Arc<dyn DocumentSource>,
    artifacts: Arc<dyn ArtifactStore>,
    index: Arc<dyn IndexAttachment>,
    store: StoreHandle,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        artifacts: Arc<dyn ArtifactStore>,
        index: Arc<dyn IndexAttachment>,
        store: StoreHandle,
    ) -> Self {
        Self {
            source,
            artifacts,
            index,
            store,
        }
    }

    /// Bring `target.index_id` in line with `target.folder_id`.
    ///
    /// Per-document failures are collected in the summary. Listing the folder
    /// or reaching the record store failing aborts the pass.
    pub async fn reconcile(&self, target: &ReconcileTarget) -> Result<SyncSummary> {
        let entries = self.source.list_folder(&target.folder_id).await?;
        let listed = entries.len();
        let documents: Vec<SourceDocument> = entries
            .into_iter()
            .filter_map(crate::source::SourceEntry::into_document)
            .collect();
        if documents.len() < listed {
            tracing::debug!(
                folder_id = %target.folder_id,
                ignored = listed - documents.len(),
                "Ignoring malformed folder entries"
            );
        }

        tracing::info!(
            collection_key = %target.collection_key,
            folder_id = %target.folder_id,
            documents = documents.len(),
            "Reconciling folder"
        );

        let mut summary = SyncSummary::default();
        for document in &documents {
            let existing = self
                .store
                .with_records(|records| records.get(&document.id))
                .await?;

            if let Some(record) = &existing {
                if record.is_current(document.modified_time) {
                    tracing::debug!(document_id = %document.id, "Unchanged, skipping");
                    summary.skipped += 1;
                    continue;
                }
            }

            match self.sync_document(target, document, existing).await {
                Ok(record) => {
                    tracing::info!(
                        document_id = %record.document_id,
                        artifact_id = record.artifact_id.as_deref().unwrap_or_default(),
                        index_id = %record.index_id,
                        "Synced document"
                    );
                    summary.processed += 1;
                }
                Err(error) if error.is_store_failure() => return Err(error),
                Err(error) => {
                    tracing::warn!(
                        document_id = %document.id,
                        error = %sanitize(&error),
                        "Failed to sync document"
                    );
                    summary.errors.push(DocumentError {
                        document_id: document.id.clone(),
                        message: error.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            collection_key = %target.collection_key,
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.errors.len(),
            "Reconcile finished"
        );
        Ok(summary)
    }

    async fn sync_document(
        &self,
        target: &ReconcileTarget,
        document: &SourceDocument,
        existing: Option<SyncRecord>,
    ) -> Result<SyncRecord> {
        if let Some(previous) = &existing {
            self.retire(previous).await?;
        }

        let bytes = if document.is_native_document() {
            self.source.export_plain_text(&document.id).await?
        } else {
            self.source.download(&document.id).await?
        };

        let display_name = normalize_display_name(&document.name);
        let artifact_id = self.artifacts.upload(&display_name, bytes).await?;

        if let Err(error) = self.index.attach(&target.index_id, &artifact_id).await {
            if let Err(cleanup) = self.artifacts.delete(&artifact_id).await {
                tracing::warn!(
                    artifact_id = %artifact_id,
                    error = %sanitize(&cleanup),
                    "Could not remove unattached artifact"
                );
            }
            return Err(error);
        }

        let record = SyncRecord {
            document_id: document.id.clone(),
            display_name,
            artifact_id: Some(artifact_id),
            last_modified: document.modified_time,
            collection_key: target.collection_key.clone(),
            index_id: target.index_id.clone(),
            synced_at: Utc::now(),
        };
        self.store
            .with_records(|records| records.upsert(&record))
            .await?;
        Ok(record)
    }

    /// Detach then delete the previously synced artifact. Already-gone is fine.
    async fn retire(&self, previous: &SyncRecord) -> Result<()> {
        let Some(artifact_id) = previous.artifact_id.as_deref() else {
            return Ok(());
        };

        ignore_missing(self.index.detach(&previous.index_id, artifact_id).await)?;
        ignore_missing(self.artifacts.delete(artifact_id).await)?;
        tracing::debug!(
            document_id = %previous.document_id,
            artifact_id,
            "Retired stale artifact"
        );
        Ok(())
    }

    /// Remove every synced artifact remotely, then clear all records.
    ///
    /// Remote failures are logged and skipped; the records are cleared regardless.
    pub async fn flush(&self) -> Result<usize> {
        let records = self.store.with_records(|records| records.list()).await?;

        for record in &records {
            let Some(artifact_id) = record.artifact_id.as_deref() else {
                continue;
            };
            if let Err(error) = self.index.detach(&record.index_id, artifact_id).await {
                tracing::warn!(
                    artifact_id,
                    index_id = %record.index_id,
                    error = %sanitize(&error),
                    "Failed to detach artifact during flush"
                );
            }
            if let Err(error) = self.artifacts.delete(artifact_id).await {
                tracing::warn!(
                    artifact_id,
                    error = %sanitize(&error),
                    "Failed to delete artifact during flush"
                );
            }
        }

        let removed = self.store.with_records(|records| records.clear()).await?;
        tracing::info!(removed, "Flushed training records");
        Ok(removed)
    }
}

fn ignore_missing(result: Result<()>) -> Result<()> {
    match result {
        Err(Error::NotFound(_)) => Ok(()),
        other => other,
    }
}
