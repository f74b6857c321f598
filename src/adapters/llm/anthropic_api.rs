//! Anthropic Messages API completion provider.
//!
//! Single-shot, non-streaming calls: one system prompt, one user message,
//! text blocks joined into the reply.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CompletionRequest, LlmConfig};
use crate::domain::ports::CompletionProvider;

/// Message role in the Messages API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the caller
    User,
    /// Message from the model
    Assistant,
}

/// Content block in a message or response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    /// Text content
    #[serde(rename = "text")]
    Text {
        /// Block text
        text: String,
    },
    /// Any other block type; ignored
    #[serde(other)]
    Other,
}

/// One conversation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Author role
    pub role: MessageRole,
    /// Content blocks
    pub content: Vec<ContentBlock>,
}

/// Request body for `POST /v1/messages`.
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    /// Model id
    pub model: String,
    /// Reply token cap
    pub max_tokens: u32,
    /// System prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Conversation, here a single user message
    pub messages: Vec<Message>,
}

/// Token accounting of a response.
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    /// Prompt tokens
    pub input_tokens: u64,
    /// Reply tokens
    pub output_tokens: u64,
}

/// Response body of `POST /v1/messages`.
#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    /// Message id
    pub id: String,
    /// Reply content blocks
    pub content: Vec<ContentBlock>,
    /// Model that answered
    pub model: String,
    /// Why generation stopped
    pub stop_reason: Option<String>,
    /// Token usage
    pub usage: Usage,
}

/// Completion provider backed by the Anthropic API.
pub struct AnthropicCompletionProvider {
    config: LlmConfig,
    client: Client,
}

impl AnthropicCompletionProvider {
    /// Build the HTTP client. The API key is resolved per call.
    pub fn new(config: LlmConfig) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                DomainError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// API key from config, falling back to `ANTHROPIC_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        self.config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
    }

    fn build_request(&self, request: &CompletionRequest) -> MessagesRequest {
        let system = if request.system_prompt.is_empty() {
            None
        } else {
            Some(request.system_prompt.clone())
        };

        MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
            system,
            messages: vec![Message {
                role: MessageRole::User,
                content: vec![ContentBlock::Text {
                    text: request.user_prompt.clone(),
                }],
            }],
        }
    }
}

#[async_trait]
impl CompletionProvider for AnthropicCompletionProvider {
    fn name(&self) -> &'static str {
        "anthropic_api"
    }

    #[instrument(skip(self, request), fields(model = %self.config.model))]
    async fn complete(&self, request: CompletionRequest) -> DomainResult<String> {
        let api_key = self
            .api_key()
            .ok_or_else(|| DomainError::Configuration("ANTHROPIC_API_KEY not set".to_string()))?;

        let api_request = self.build_request(&request);

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", &api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| DomainError::Completion(format!("API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::Completion(format!(
                "API error {}: {}",
                status, body
            )));
        }

        let result: MessagesResponse = response
            .json()
            .await
            .map_err(|e| DomainError::Completion(format!("Failed to parse response: {}", e)))?;

        debug!(
            input_tokens = result.usage.input_tokens,
            output_tokens = result.usage.output_tokens,
            stop_reason = ?result.stop_reason,
            "completion finished"
        );

        let text = result
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(text)
    }
}
