//! Chat relay: forwards assistant run deltas to an outgoing byte stream.
//!
//! Only opening a turn can fail the caller. Once streaming has started,
//! upstream errors become a single inline notice.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::util::sanitize;
use crate::Result;

/// Notice written in place of upstream error details.
pub const STREAM_ERROR_NOTICE: &str = "\nError while streaming response.\n";

const OUTPUT_BUFFER: usize = 32;

/// One decoded event from an assistant run stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// Incremental assistant text
    MessageDelta(String),
    /// Upstream reported a failure
    Error(String),
    /// Upstream finished the run stream
    Done,
    /// Any other event, by name
    Other(String),
}

pub type RunEventStream = BoxStream<'static, Result<RunEvent>>;

/// A stored message from a conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadMessage {
    pub role: String,
    pub content: String,
    /// Unix seconds
    pub timestamp: i64,
}

/// Upstream conversational runs.
#[async_trait]
pub trait AssistantRuns: Send + Sync {
    async fn create_thread(&self) -> Result<String>;

    async fn add_user_message(&self, thread_id: &str, content: &str) -> Result<()>;

    async fn stream_run(&self, thread_id: &str, assistant_id: &str) -> Result<RunEventStream>;

    /// Messages of a thread, oldest first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>>;
}

/// One user turn to relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    /// Existing thread to resume; a new thread is created when absent
    pub thread_id: Option<String>,
    pub assistant_id: String,
    pub message: String,
}

/// How a relayed stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Completed,
    Failed,
    /// The receiving side went away first
    Cancelled,
}

/// An open relay: the thread in use plus the outgoing byte stream.
pub struct RelaySession {
    pub thread_id: String,
    pub output: mpsc::Receiver<Bytes>,
    pub task: tokio::task::JoinHandle<RelayOutcome>,
}

#[derive(Clone)]
pub struct ChatRelay {
    runs: Arc<dyn AssistantRuns>,
}

impl ChatRelay {
    pub fn new(runs: Arc<dyn AssistantRuns>) -> Self {
        Self { runs }
    }

    /// Resolve the thread, send the message and open the run stream.
    ///
    /// Errors here happen before any output exists and are returned to the caller.
    pub async fn open(&self, turn: ChatTurn) -> Result<RelaySession> {
        let thread_id = match turn.thread_id {
            Some(thread_id) => {
                tracing::info!(thread_id = %thread_id, "Resuming thread");
                thread_id
            }
            None => self.runs.create_thread().await?,
        };

        self.runs
            .add_user_message(&thread_id, &turn.message)
            .await?;
        let events = self.runs.stream_run(&thread_id, &turn.assistant_id).await?;

        let (sender, output) = mpsc::channel(OUTPUT_BUFFER);
        let task_thread = thread_id.clone();
        let task = tokio::spawn(async move {
            let outcome = forward_events(events, sender).await;
            tracing::info!(thread_id = %task_thread, ?outcome, "Relay stream closed");
            outcome
        });

        Ok(RelaySession {
            thread_id,
            output,
            task,
        })
    }

    /// Conversation history for a thread.
    pub async fn history(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        self.runs.list_messages(thread_id).await
    }
}

/// Forward text deltas in arrival order until the upstream ends, fails, or the
/// receiver is dropped. Dropping `events` on return releases the upstream stream.
pub async fn forward_events(
    mut events: RunEventStream,
    sender: mpsc::Sender<Bytes>,
) -> RelayOutcome {
    loop {
        let next = tokio::select! {
            event = events.next() => event,
            () = sender.closed() => return RelayOutcome::Cancelled,
        };

        match next {
            None | Some(Ok(RunEvent::Done)) => return RelayOutcome::Completed,
            Some(Ok(RunEvent::MessageDelta(text))) => {
                tracing::debug!(token = %text, "Streaming token");
                if sender.send(Bytes::from(text)).await.is_err() {
                    return RelayOutcome::Cancelled;
                }
            }
            Some(Ok(RunEvent::Other(_))) => {}
            Some(Ok(RunEvent::Error(message))) => {
                tracing::warn!(error = %message, "Upstream run reported an error");
                return send_error_notice(&sender).await;
            }
            Some(Err(error)) => {
                tracing::warn!(error = %sanitize(&error), "Streaming error");
                return send_error_notice(&sender).await;
            }
        }
    }
}

async fn send_error_notice(sender: &mpsc::Sender<Bytes>) -> RelayOutcome {
    if sender
        .send(Bytes::from_static(STREAM_ERROR_NOTICE.as_bytes()))
        .await
        .is_err()
    {
        return RelayOutcome::Cancelled;
    }
    RelayOutcome::Failed
}
