//! Completion request model.

use serde::{Deserialize, Serialize};

/// A single-shot prompt sent to the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Role and instructions
    pub system_prompt: String,
    /// Message to complete
    pub user_prompt: String,

    /// Overrides the configured default when set
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Request with the default token budget.
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            max_tokens: None,
        }
    }

    /// Cap the reply at `max_tokens`.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}
