//! OpenAI REST client backing the artifact store, index, assistant and enrichment seams.

mod assistants;
mod chat;
mod files;
mod sse;
mod vector_stores;

use std::fmt;

use crate::poll::PollPolicy;
use crate::util::compact_text;
use crate::{Error, Result};

pub use chat::{ChatCompletionEnricher, DEFAULT_ENRICHMENT_MODEL};
pub use sse::SseDecoder;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const SERVICE: &str = "OpenAI";
const BETA_HEADER: &str = "OpenAI-Beta";
const BETA_ASSISTANTS: &str = "assistants=v2";

/// Shared HTTP client plus credentials for the OpenAI API.
#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    processing_poll: PollPolicy,
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("OpenAiClient")
            .field("api_base", &self.api_base)
            .field("api_key", &"[REDACTED]")
            .field("processing_poll", &self.processing_poll)
            .finish()
    }
}

impl OpenAiClient {
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            processing_poll: PollPolicy::default(),
        }
    }

    /// Override how long uploads wait for file processing.
    #[must_use]
    pub const fn with_processing_poll(mut self, policy: PollPolicy) -> Self {
        self.processing_poll = policy;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    fn get_request(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_ASSISTANTS)
    }

    fn post_request(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_ASSISTANTS)
    }

    fn delete_request(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .delete(self.url(path))
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_ASSISTANTS)
    }
}

/// Pass successful responses through; map failures to `Error`.
async fn check_status(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = api_error_message(&body);
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(Error::NotFound(format!("{action}: {detail}")));
    }
    Err(Error::upstream(
        SERVICE,
        format!("{action} failed with HTTP {}: {detail}", status.as_u16()),
    ))
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| compact_text(body))
}
