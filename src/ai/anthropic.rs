use async_trait::async_trait;
use chrono::{DateTime, Local};

use super::{CommandInterpreter, Interpretation, keyring};
use crate::core::event::CalendarEvent;
use crate::error::{AssistantError, Result};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2048;

/// Calendar interpreter backed by the Anthropic Messages API.
pub struct AnthropicInterpreter {
    client: reqwest::Client,
    model: String,
    api_key: Option<String>,
}

impl AnthropicInterpreter {
    pub fn new(model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            model: model.into(),
            api_key,
        }
    }

    /// Build with the key from `ANTHROPIC_API_KEY` or the keyring.
    pub async fn from_environment(model: impl Into<String>) -> Self {
        let api_key = match keyring::resolve_api_key().await {
            Ok(key) => key,
            Err(e) => {
                log::warn!("Could not read API key: {}", e);
                None
            }
        };
        if api_key.is_none() {
            log::warn!("No Anthropic API key found; calendar requests will fail until one is set");
        }
        Self::new(model, api_key)
    }

    async fn api_key(&self) -> Result<String> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        // The key may have been stored with lucy-key after start-up.
        keyring::resolve_api_key()
            .await?
            .ok_or(AssistantError::MissingApiKey)
    }
}

#[async_trait]
impl CommandInterpreter for AnthropicInterpreter {
    async fn interpret(
        &self,
        free_text: &str,
        current_events: &[CalendarEvent],
    ) -> Result<Interpretation> {
        let api_key = self.api_key().await?;

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": build_system_prompt(Local::now()),
            "messages": [
                { "role": "user", "content": build_user_message(free_text, current_events)? }
            ]
        });

        log::debug!(
            "Interpreting {:?} against {} events with {}",
            free_text,
            current_events.len(),
            self.model
        );

        let resp = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AssistantError::Api { status, body });
        }

        let api_resp: serde_json::Value = resp.json().await?;
        parse_interpretation(first_text_block(&api_resp)?)
    }
}

/// Verify an API key with a minimal request.
pub async fn test_api_key(api_key: &str, model: &str) -> Result<String> {
    let body = serde_json::json!({
        "model": model,
        "max_tokens": 4,
        "messages": [
            { "role": "user", "content": "Reply with OK" }
        ]
    });

    let resp = reqwest::Client::new()
        .post(MESSAGES_URL)
        .header("x-api-key", api_key)
        .header("anthropic-version", API_VERSION)
        .header("content-type", "application/json")
        .json(&body)
        .send()
        .await?;

    if resp.status().is_success() {
        Ok("API key valid".to_string())
    } else {
        let status = resp.status().as_u16();
        let body = if status == 401 {
            "Invalid API key".to_string()
        } else {
            resp.text().await.unwrap_or_default()
        };
        Err(AssistantError::Api { status, body })
    }
}

fn build_system_prompt(now: DateTime<Local>) -> String {
    let mut prompt = String::from(
        "Sei Lucy, un'assistente calendario amichevole. Rispondi sempre in italiano.\n\
         Return ONLY a JSON object, no explanation, with this shape:\n\
         {\"responseText\": string, \"updatedEvents\": array | null}\n\n\
         Rules:\n\
         - \"responseText\": short natural-language reply for the user\n\
         - \"updatedEvents\": null when the calendar does not change. Otherwise the COMPLETE \
         list of events after the change, including the untouched ones. Never a partial list.\n\
         - Each event is {\"id\": string, \"title\": string, \"startTime\": string, \"endTime\": string}\n\
         - Keep existing ids; invent a new unique id for new events\n\
         - Times are ISO 8601 with a timezone offset, e.g. 2026-03-02T15:00:00+01:00\n\
         - startTime must not be after endTime\n\n",
    );

    prompt.push_str(&format!(
        "Current local date and time: {}\n",
        now.format("%Y-%m-%dT%H:%M:%S%:z (%A)")
    ));

    prompt
}

fn build_user_message(free_text: &str, events: &[CalendarEvent]) -> Result<String> {
    let events_json = serde_json::to_string_pretty(events)?;
    Ok(format!(
        "Request: {}\n\nCurrent events:\n{}",
        free_text.trim(),
        events_json
    ))
}

fn first_text_block(api_resp: &serde_json::Value) -> Result<&str> {
    api_resp["content"]
        .as_array()
        .and_then(|arr| arr.iter().find(|block| block["type"] == "text"))
        .and_then(|block| block["text"].as_str())
        .ok_or(AssistantError::EmptyResponse)
}

/// Strip Markdown code fences the model sometimes wraps JSON in.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn parse_interpretation(text: &str) -> Result<Interpretation> {
    serde_json::from_str::<Interpretation>(strip_code_fences(text))
        .map_err(|e| AssistantError::Parse(format!("{} (raw: {})", e, text)))
}
