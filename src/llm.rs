use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::config::PerplexityConfig;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Perplexity request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Perplexity API error: {status}: {body}")]
    Api { status: StatusCode, body: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Body of `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

/// Only `choices[0].message.content` is read; everything else is ignored
/// and every level may be missing or null.
#[derive(Debug, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Option<Vec<Option<Choice>>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    pub fn into_content(self) -> Option<String> {
        self.choices
            .and_then(|choices| choices.into_iter().next())
            .flatten()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
    }
}

/// A chat-completion backend. The flows only talk to the model through
/// this trait so tests can swap in a recording fake.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model name placed in every request.
    fn model(&self) -> &str;

    /// Send one request. `Ok(None)` means the response carried no content.
    async fn complete(&self, request: &ChatRequest) -> Result<Option<String>, LlmError>;

    /// Like [`ChatModel::complete`], substituting `fallback` for missing or
    /// empty content.
    async fn complete_or(&self, request: &ChatRequest, fallback: &str) -> Result<String, LlmError> {
        let content = self
            .complete(request)
            .await?
            .filter(|content| !content.is_empty());
        Ok(content.unwrap_or_else(|| fallback.to_string()))
    }
}

/// Perplexity chat-completions client.
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl LlmClient {
    pub fn new(config: &PerplexityConfig, api_key: &str) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %request.model, max_tokens = request.max_tokens))]
    async fn complete(&self, request: &ChatRequest) -> Result<Option<String>, LlmError> {
        debug!(messages = request.messages.len(), "sending chat completion request");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "Perplexity API error");
            return Err(LlmError::Api { status, body });
        }

        let parsed = response.json::<ChatResponse>().await?;
        let content = parsed.into_content();
        debug!(
            content_len = content.as_ref().map(String::len).unwrap_or(0),
            "received chat completion"
        );
        Ok(content)
    }
}
