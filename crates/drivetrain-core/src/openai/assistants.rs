//! `AssistantRuns` over the OpenAI Assistants (threads/runs) API.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};

use super::sse::SseDecoder;
use super::{check_status, OpenAiClient};
use crate::relay::{AssistantRuns, RunEvent, RunEventStream, ThreadMessage};
use crate::Result;

const HISTORY_PAGE_LIMIT: &str = "100";
/// Per-request timeout for streamed runs; replaces the client-wide one.
const RUN_STREAM_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Deserialize)]
struct ThreadObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<MessageObject>,
}

#[derive(Debug, Deserialize)]
struct MessageObject {
    role: String,
    created_at: i64,
    #[serde(default)]
    content: Vec<Value>,
}

impl From<MessageObject> for ThreadMessage {
    fn from(message: MessageObject) -> Self {
        let content = message
            .content
            .first()
            .and_then(|block| block.pointer("/text/value"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            role: message.role,
            content,
            timestamp: message.created_at,
        }
    }
}

#[async_trait]
impl AssistantRuns for OpenAiClient {
    async fn create_thread(&self) -> Result<String> {
        let response = self.post_request("threads").json(&json!({})).send().await?;
        let response = check_status(response, "Create thread").await?;
        let thread = response.json::<ThreadObject>().await?;
        tracing::info!(thread_id = %thread.id, "Created thread");
        Ok(thread.id)
    }

    async fn add_user_message(&self, thread_id: &str, content: &str) -> Result<()> {
        let response = self
            .post_request(&format!("threads/{thread_id}/messages"))
            .json(&json!({ "role": "user", "content": content }))
            .send()
            .await?;
        check_status(response, "Add thread message").await?;
        tracing::info!(thread_id, "Added user message to thread");
        Ok(())
    }

    async fn stream_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunEventStream> {
        let response = self
            .post_request(&format!("threads/{thread_id}/runs"))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .timeout(RUN_STREAM_TIMEOUT)
            .json(&json!({ "assistant_id": assistant_id, "stream": true }))
            .send()
            .await?;
        let response = check_status(response, "Start run stream").await?;
        tracing::info!(thread_id, assistant_id, "Assistant run stream started");

        let body = response.bytes_stream().boxed();
        let events = stream::unfold(
            (body, SseDecoder::new(), false),
            |(mut body, mut decoder, finished)| async move {
                if finished {
                    return None;
                }
                let (batch, finished): (Vec<Result<RunEvent>>, bool) = match body.next().await {
                    Some(Ok(chunk)) => (decoder.push(&chunk).into_iter().map(Ok).collect(), false),
                    Some(Err(error)) => (vec![Err(error.into())], true),
                    None => (decoder.finish().into_iter().map(Ok).collect(), true),
                };
                Some((batch, (body, decoder, finished)))
            },
        )
        .flat_map(stream::iter)
        .boxed();

        Ok(events)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let response = self
            .get_request(&format!("threads/{thread_id}/messages"))
            .query(&[("order", "asc"), ("limit", HISTORY_PAGE_LIMIT)])
            .send()
            .await?;
        let response = check_status(response, "List thread messages").await?;
        let list = response.json::<MessageList>().await?;

        let mut messages: Vec<ThreadMessage> = list.data.into_iter().map(Into::into).collect();
        messages.sort_by_key(|message| message.timestamp);
        tracing::info!(thread_id, count = messages.len(), "Retrieved thread messages");
        Ok(messages)
    }
}
