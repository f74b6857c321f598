//! Completion port - interface for the hosted LLM.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::CompletionRequest;

/// A text-in, text-out completion backend.
///
/// Every agent role (planner, classifier, analyzer, generator) is a
/// different prompt against the same provider.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Backend name used in logs.
    fn name(&self) -> &'static str;

    /// Run one completion and return the concatenated text output.
    async fn complete(&self, request: CompletionRequest) -> DomainResult<String>;
}
