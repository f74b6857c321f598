//! Knowledge-base port - managed retrieve-and-generate endpoint.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::RetrieveAndGenerateResponse;

/// Managed retrieval service answering questions over a relational schema.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Answer a natural-language question against the given knowledge base,
    /// citing the SQL used when there is any.
    async fn retrieve_and_generate(
        &self,
        question: &str,
        knowledge_base_id: &str,
    ) -> DomainResult<RetrieveAndGenerateResponse>;
}
