//! `PageEnricher` backed by chat completions.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{check_status, OpenAiClient};
use crate::models::Enrichment;
use crate::tracking::PageEnricher;
use crate::Result;

pub const DEFAULT_ENRICHMENT_MODEL: &str = "gpt-4";

const SUBJECTS: &str = "Science, Technology, Engineering, Art, Math, Biology, Chemistry, Physics, \
Environmental Science, Astronomy, Health & Medicine, Psychology, Sociology, Computer Science, \
Software Development, AI & Machine Learning, Data Science, Cybersecurity, Cloud Computing, \
Electrical Engineering, Mechanical Engineering, Civil Engineering, Robotics, Aerospace Engineering, \
Visual Arts, Design, Music, Performing Arts, Literature, Creative Writing, Algebra, Calculus, \
Statistics, Logic & Reasoning, History, Business, Economics, Languages, Philosophy, Education, \
Law, General Knowledge";

/// Classifies page text into learning metadata with a single completion.
#[derive(Debug, Clone)]
pub struct ChatCompletionEnricher {
    client: OpenAiClient,
    model: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnrichmentReply {
    title: String,
    description: String,
    subject: String,
    confidence: String,
}

impl ChatCompletionEnricher {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

fn classification_prompt(page_content: &str) -> String {
    format!(
        "Classify the learning value of a web page from its visible text.\n\n\
         Page text:\n\"{page_content}\"\n\n\
         Reply with strict JSON only, using exactly these fields:\n\
         {{\"title\": \"short meaningful page title\", \
         \"description\": \"two or three sentences on what a learner gains from the page\", \
         \"subject\": \"the single best match from: {SUBJECTS}\", \
         \"confidence\": \"High, Medium or Low: how educational the page is\"}}\n\
         For pages that are clearly not educational, still choose the closest subject and use Low."
    )
}

/// Parse the model reply; tolerates surrounding code fences. `None` when not JSON.
fn parse_enrichment_reply(reply: &str) -> Option<Enrichment> {
    let trimmed = reply.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    let parsed: EnrichmentReply = serde_json::from_str(body.trim()).ok()?;
    Some(Enrichment {
        title: parsed.title,
        description: parsed.description,
        subject: parsed.subject,
        confidence: parsed.confidence,
    })
}

#[async_trait]
impl PageEnricher for ChatCompletionEnricher {
    async fn enrich(&self, page_content: &str) -> Result<Enrichment> {
        let response = self
            .client
            .post_request("chat/completions")
            .json(&json!({
                "model": self.model,
                "temperature": 0,
                "messages": [{ "role": "user", "content": classification_prompt(page_content) }],
            }))
            .send()
            .await?;
        let response = check_status(response, "Chat completion").await?;
        let completion = response.json::<CompletionResponse>().await?;

        let reply = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(parse_enrichment_reply(&reply).unwrap_or_else(|| {
            tracing::warn!("Enrichment reply was not valid JSON; storing empty enrichment");
            Enrichment::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_plain_json_reply() {
        let enrichment = parse_enrichment_reply(
            r#"{"title":"Ownership in Rust","description":"Explains borrowing.","subject":"Software Development","confidence":"High"}"#,
        )
        .unwrap();
        assert_eq!(enrichment.subject, "Software Development");
        assert_eq!(enrichment.confidence, "High");
    }

    #[test]
    fn parses_fenced_reply_with_missing_fields() {
        let enrichment =
            parse_enrichment_reply("```json\n{\"title\":\"Tides\",\"subject\":\"Physics\"}\n```")
                .unwrap();
        assert_eq!(
            enrichment,
            Enrichment {
                title: "Tides".to_string(),
                description: String::new(),
                subject: "Physics".to_string(),
                confidence: String::new(),
            }
        );
    }

    #[test]
    fn rejects_prose_reply() {
        assert!(parse_enrichment_reply("I think this page is about history.").is_none());
    }

    #[test]
    fn prompt_embeds_page_text() {
        let prompt = classification_prompt("Photosynthesis converts light");
        assert!(prompt.contains("Photosynthesis converts light"));
        assert!(prompt.contains("General Knowledge"));
    }
}
