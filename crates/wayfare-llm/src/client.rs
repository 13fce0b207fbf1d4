//! Chat-completions HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use wayfare_core::config::LlmConfig;

use crate::error::LlmError;

// =============================================================================
// Wire types
// =============================================================================

/// Role of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message in a completion request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Request body for `POST /v1/chat/completions`.
#[derive(Clone, Debug, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

// =============================================================================
// CompletionClient trait
// =============================================================================

/// Abstraction over the completion provider.
///
/// The conversation layer is written against this trait so stage and
/// controller tests can substitute an in-memory implementation.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send a single-prompt completion request and return the text of
    /// the first choice.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

// =============================================================================
// HttpCompletionClient
// =============================================================================

/// OpenAI-style chat-completions client over HTTP.
pub struct HttpCompletionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl HttpCompletionClient {
    /// Build a client from the configured provider settings.
    pub fn new(config: &LlmConfig, api_key: &str) -> Result<Self, LlmError> {
        Self::with_base_url(config, api_key, config.base_url.clone())
    }

    /// Build a client pointed at an explicit base URL.
    ///
    /// Used by tests to target a local mock server.
    pub fn with_base_url(
        config: &LlmConfig,
        api_key: &str,
        base_url: String,
    ) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: Role::User,
                content: prompt.to_string(),
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(model = %self.model, prompt_len = prompt.len(), "Sending completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response.json().await?;
        let choice = parsed.choices.into_iter().next().ok_or(LlmError::NoChoices)?;

        let content = choice.message.content.trim().to_string();
        if content.is_empty() {
            return Err(LlmError::EmptyCompletion);
        }

        debug!(completion_len = content.len(), "Completion received");
        Ok(content)
    }
}
