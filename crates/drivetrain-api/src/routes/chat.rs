use std::convert::Infallible;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use drivetrain_core::departments::department_message;
use drivetrain_core::relay::{ChatTurn, ThreadMessage};
use drivetrain_core::util::{normalize_text_option, sanitize};
use http::{header, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use super::AppState;
use crate::error::AppError;

pub(super) const THREAD_ID_HEADER: HeaderName = HeaderName::from_static("x-thread-id");

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ChatStreamRequest {
    message: Option<String>,
    /// Thread to resume
    #[serde(alias = "threadId")]
    conversation_context: Option<String>,
    #[serde(alias = "chatAssistantId")]
    assistant_id: Option<String>,
    department: Option<String>,
}

impl ChatStreamRequest {
    /// An explicit assistant wins over the department's assistant.
    fn resolve(self, state: &AppState) -> Result<ChatTurn, AppError> {
        let message = normalize_text_option(self.message)
            .ok_or_else(|| AppError::bad_request("Missing message"))?;
        let department = normalize_text_option(self.department);

        let assistant_id = match (normalize_text_option(self.assistant_id), &department) {
            (Some(assistant_id), _) => assistant_id,
            (None, Some(key)) => state
                .departments
                .get(key)
                .map(|department| department.assistant_id.clone())
                .ok_or_else(|| AppError::bad_request(format!("Unknown department: {key}")))?,
            (None, None) => return Err(AppError::bad_request("Missing assistantId")),
        };

        let message = match &department {
            Some(key) => department_message(key, &message),
            None => message,
        };

        Ok(ChatTurn {
            thread_id: normalize_text_option(self.conversation_context),
            assistant_id,
            message,
        })
    }
}

pub(super) async fn stream(
    State(state): State<AppState>,
    payload: Result<Json<ChatStreamRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let turn = request.resolve(&state)?;
    let assistant_id = turn.assistant_id.clone();

    let session = state.relay.open(turn).await.map_err(|error| {
        tracing::error!(
            assistant_id = %assistant_id,
            error = %sanitize(&error),
            "Failed to start assistant run"
        );
        AppError::internal("Failed to start chat")
    })?;
    tracing::info!(thread_id = %session.thread_id, assistant_id = %assistant_id, "Streaming assistant run");

    let thread_id = HeaderValue::from_str(&session.thread_id)
        .map_err(|_| AppError::internal("Upstream returned an invalid thread id"))?;
    let body = Body::from_stream(ReceiverStream::new(session.output).map(Ok::<_, Infallible>));

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache, no-transform"),
            ),
            (THREAD_ID_HEADER, thread_id),
        ],
        body,
    )
        .into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ThreadHistoryRequest {
    thread_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ThreadHistoryResponse {
    messages: Vec<ThreadMessage>,
}

pub(super) async fn thread_history(
    State(state): State<AppState>,
    payload: Result<Json<ThreadHistoryRequest>, JsonRejection>,
) -> Result<Json<ThreadHistoryResponse>, AppError> {
    let Json(request) = payload?;
    let thread_id = normalize_text_option(request.thread_id)
        .ok_or_else(|| AppError::bad_request("Missing threadId"))?;

    let messages = state.relay.history(&thread_id).await.map_err(|error| {
        tracing::error!(thread_id = %thread_id, error = %sanitize(&error), "Failed to fetch thread");
        AppError::internal("Failed to fetch thread")
    })?;
    Ok(Json(ThreadHistoryResponse { messages }))
}
