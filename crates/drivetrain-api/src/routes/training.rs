use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use drivetrain_core::sync::ReconcileTarget;
use drivetrain_core::util::normalize_text_option;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TrainRequest {
    #[serde(alias = "department")]
    collection_key: Option<String>,
    folder_id: Option<String>,
    #[serde(alias = "vectorStoreId")]
    index_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct TrainResponse {
    message: String,
    processed: usize,
    skipped: usize,
    failed: usize,
}

#[derive(Debug, Serialize)]
pub(super) struct FlushResponse {
    success: bool,
    message: &'static str,
    removed: usize,
}

impl TrainRequest {
    /// Explicit folder and index win; the department directory fills the gaps.
    fn resolve(self, state: &AppState) -> Result<ReconcileTarget, AppError> {
        let collection_key = normalize_text_option(self.collection_key)
            .ok_or_else(|| AppError::bad_request("Missing collectionKey"))?;
        let department = state.departments.get(&collection_key);

        let folder_id = normalize_text_option(self.folder_id)
            .or_else(|| department.map(|department| department.folder_id.clone()))
            .ok_or_else(|| AppError::bad_request("Missing folderId"))?;
        let index_id = normalize_text_option(self.index_id)
            .or_else(|| department.map(|department| department.index_id.clone()))
            .ok_or_else(|| AppError::bad_request("Missing indexId"))?;

        Ok(ReconcileTarget {
            collection_key,
            folder_id,
            index_id,
        })
    }
}

pub(super) async fn train(
    State(state): State<AppState>,
    payload: Result<Json<TrainRequest>, JsonRejection>,
) -> Result<Json<TrainResponse>, AppError> {
    let Json(request) = payload?;
    let target = request.resolve(&state)?;

    let summary = state.reconciler.reconcile(&target).await?;
    for error in &summary.errors {
        tracing::warn!(
            document_id = %error.document_id,
            error = %error.message,
            "Document was not synced"
        );
    }

    Ok(Json(TrainResponse {
        message: format!("Training for {} completed", target.collection_key),
        processed: summary.processed,
        skipped: summary.skipped,
        failed: summary.errors.len(),
    }))
}

pub(super) async fn flush_training(
    State(state): State<AppState>,
) -> Result<Json<FlushResponse>, AppError> {
    let removed = state.reconciler.flush().await?;
    Ok(Json(FlushResponse {
        success: true,
        message: "Training data deleted",
        removed,
    }))
}
