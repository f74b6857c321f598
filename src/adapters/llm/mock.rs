//! Scripted completion provider for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::CompletionRequest;
use crate::domain::ports::CompletionProvider;

/// Mock response configuration.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Output text
    pub output: String,
    /// Whether to simulate failure
    pub fail: bool,
    /// Error message if failing
    pub error_message: Option<String>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            output: "Mock completion.".to_string(),
            fail: false,
            error_message: None,
        }
    }
}

impl MockResponse {
    /// Reply with `output`.
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            ..Default::default()
        }
    }

    /// Fail with a completion error carrying `error`.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            fail: true,
            error_message: Some(error.into()),
            ..Default::default()
        }
    }

    fn into_result(self) -> DomainResult<String> {
        if self.fail {
            Err(DomainError::Completion(
                self.error_message
                    .unwrap_or_else(|| "Mock failure".to_string()),
            ))
        } else {
            Ok(self.output)
        }
    }
}

/// Completion provider answering from rules and a FIFO script.
///
/// Rules match a substring of the system prompt and answer every matching
/// call. Calls no rule matches take the next scripted response, then the
/// default.
pub struct MockCompletionProvider {
    rules: Arc<RwLock<Vec<(String, MockResponse)>>>,
    script: Arc<RwLock<VecDeque<MockResponse>>>,
    default_response: MockResponse,
    requests: Arc<RwLock<Vec<CompletionRequest>>>,
}

impl MockCompletionProvider {
    /// Provider whose default reply is "Mock completion.".
    pub fn new() -> Self {
        Self::with_default_response(MockResponse::default())
    }

    /// Provider answering unmatched, unscripted calls with `response`.
    pub fn with_default_response(response: MockResponse) -> Self {
        Self {
            rules: Arc::new(RwLock::new(Vec::new())),
            script: Arc::new(RwLock::new(VecDeque::new())),
            default_response: response,
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Answer every call whose system prompt contains `marker`.
    pub async fn on_system_prompt(&self, marker: impl Into<String>, response: MockResponse) {
        self.rules.write().await.push((marker.into(), response));
    }

    /// Queue a response for the next call no rule matches.
    pub async fn push_response(&self, response: MockResponse) {
        self.script.write().await.push_back(response);
    }

    /// Every request received so far, in order.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.read().await.clone()
    }

    /// Requests whose system prompt contains `marker`.
    pub async fn requests_matching(&self, marker: &str) -> Vec<CompletionRequest> {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| r.system_prompt.contains(marker))
            .cloned()
            .collect()
    }
}

impl Default for MockCompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> DomainResult<String> {
        let matched = {
            let rules = self.rules.read().await;
            rules
                .iter()
                .find(|(marker, _)| request.system_prompt.contains(marker.as_str()))
                .map(|(_, response)| response.clone())
        };
        self.requests.write().await.push(request);

        let response = match matched {
            Some(response) => response,
            None => self
                .script
                .write()
                .await
                .pop_front()
                .unwrap_or_else(|| self.default_response.clone()),
        };
        response.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rules_take_precedence_over_script() {
        let mock = MockCompletionProvider::new();
        mock.on_system_prompt("planner", MockResponse::success("plan")).await;
        mock.push_response(MockResponse::success("scripted")).await;

        let planned = mock
            .complete(CompletionRequest::new("You are a planner", "q"))
            .await
            .unwrap();
        assert_eq!(planned, "plan");

        let scripted = mock
            .complete(CompletionRequest::new("other", "q"))
            .await
            .unwrap();
        assert_eq!(scripted, "scripted");

        let fallback = mock
            .complete(CompletionRequest::new("other", "q"))
            .await
            .unwrap();
        assert_eq!(fallback, "Mock completion.");
        assert_eq!(mock.requests().await.len(), 3);
    }

    #[tokio::test]
    async fn test_failure_response() {
        let mock = MockCompletionProvider::with_default_response(MockResponse::failure("down"));
        let err = mock
            .complete(CompletionRequest::new("s", "u"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Completion(msg) if msg == "down"));
    }
}
