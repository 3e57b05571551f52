//! LLM client used by keyword extraction, suggestion generation and the
//! semantic ATS scorer.
//!
//! Nothing else in the crate talks to the Anthropic API. Callers map every
//! `LlmError` onto their own degraded path (`GenerationUnavailable`, the
//! overlap scorer), so this module never decides policy.
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 2048;
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_MS: u64 = 500;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("LLM returned no text content")]
    EmptyContent,
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl MessagesResponse {
    /// Concatenated text blocks; tool or thinking blocks are ignored.
    fn into_text(self) -> Option<String> {
        let text: String = self
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Outcome of a single HTTP attempt.
enum Attempt {
    Done(String),
    Retry(LlmError),
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(BACKOFF_BASE_MS << attempt.saturating_sub(1))
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Anthropic Messages API wrapper with retries and a JSON helper.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self::with_endpoint(api_key, ANTHROPIC_API_URL)
    }

    /// Client pointed at a different Messages endpoint (proxies, local mocks).
    pub fn with_endpoint(api_key: String, endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            endpoint: endpoint.into(),
        }
    }

    /// `None` when no API key is configured; LLM features are then off.
    pub fn from_config(config: &Config) -> Option<Self> {
        config.anthropic_api_key.clone().map(Self::new)
    }

    /// One user turn; returns the reply text. 429 and 5xx responses and
    /// transport errors are retried with exponential backoff.
    pub async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let body = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: [UserMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error = None;
        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let delay = backoff(attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying LLM call");
                tokio::time::sleep(delay).await;
            }

            match self.attempt(&body).await? {
                Attempt::Done(text) => return Ok(text),
                Attempt::Retry(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or(LlmError::Exhausted {
            attempts: MAX_ATTEMPTS,
        }))
    }

    async fn attempt(&self, body: &MessagesRequest<'_>) -> Result<Attempt, LlmError> {
        let response = match self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return Ok(Attempt::Retry(LlmError::Http(e))),
        };

        let status = response.status();
        if is_transient(status) {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "LLM API transient failure");
            return Ok(Attempt::Retry(LlmError::Api {
                status: status.as_u16(),
                message,
            }));
        }

        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&raw)
                .map(|e| e.error.message)
                .unwrap_or(raw);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        if let Some(usage) = &parsed.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "LLM call succeeded"
            );
        }
        parsed
            .into_text()
            .map(Attempt::Done)
            .ok_or(LlmError::EmptyContent)
    }

    /// Calls the model and deserializes its reply as JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let reply = self.complete(prompt, system).await?;
        Ok(serde_json::from_str(json_payload(&reply))?)
    }
}

/// Drops markdown fences and any prose around the outermost JSON object or
/// array.
fn json_payload(reply: &str) -> &str {
    let reply = reply.trim();
    let unfenced = reply
        .strip_prefix("```json")
        .or_else(|| reply.strip_prefix("```"))
        .map(|inner| inner.trim().strip_suffix("```").unwrap_or(inner).trim())
        .unwrap_or(reply);

    match (unfenced.find(['{', '[']), unfenced.rfind(['}', ']'])) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced,
    }
}
