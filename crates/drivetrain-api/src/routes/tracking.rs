use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use drivetrain_core::models::SiteVisit;
use drivetrain_core::tracking::{DomainSummary, IngestOutcome, VisitReport, DEFAULT_USER};
use drivetrain_core::util::normalize_text_option;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub(super) struct IngestResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    visit: Option<SiteVisit>,
}

pub(super) async fn ingest(
    State(state): State<AppState>,
    payload: Result<Json<VisitReport>, JsonRejection>,
) -> Result<Json<IngestResponse>, AppError> {
    let Json(report) = payload?;

    let response = match state.tracker.ingest(report, Utc::now()).await? {
        IngestOutcome::Ignored => IngestResponse {
            message: "Site ignored (blacklisted)",
            visit: None,
        },
        IngestOutcome::Updated(visit) | IngestOutcome::Created(visit) => IngestResponse {
            message: "Site visit recorded",
            visit: Some(visit),
        },
    };
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RecordsQuery {
    root_domain: Option<String>,
}

pub(super) async fn records(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<DomainSummary>, AppError> {
    let root_domain = normalize_text_option(query.root_domain)
        .ok_or_else(|| AppError::bad_request("Missing rootDomain"))?;
    Ok(Json(state.tracker.summary(DEFAULT_USER, &root_domain).await?))
}
