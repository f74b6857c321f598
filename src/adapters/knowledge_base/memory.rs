//! In-memory knowledge base for tests and offline runs.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::retrieval::{
    Citation, GeneratedOutput, ReferenceLocation, RetrievedReference, SqlLocation,
};
use crate::domain::models::RetrieveAndGenerateResponse;
use crate::domain::ports::KnowledgeBase;

/// Answers every question with one canned response.
#[derive(Clone, Default)]
pub struct InMemoryKnowledgeBase {
    response: Arc<RwLock<Option<RetrieveAndGenerateResponse>>>,
    failure: Arc<RwLock<Option<String>>>,
    calls: Arc<RwLock<Vec<(String, String)>>>,
}

impl InMemoryKnowledgeBase {
    /// Knowledge base that fails until a response is set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer with `answer`, citing `sql` when given.
    pub fn answering(answer: impl Into<String>, sql: Option<&str>) -> Self {
        Self {
            response: Arc::new(RwLock::new(Some(Self::response(answer, sql)))),
            ..Self::default()
        }
    }

    /// Build a response in the service's wire shape.
    pub fn response(answer: impl Into<String>, sql: Option<&str>) -> RetrieveAndGenerateResponse {
        let citations = sql
            .map(|query| {
                vec![Citation {
                    retrieved_references: vec![RetrievedReference {
                        location: Some(ReferenceLocation {
                            location_type: Some("SQL".to_string()),
                            sql_location: Some(SqlLocation {
                                query: query.to_string(),
                            }),
                        }),
                    }],
                }]
            })
            .unwrap_or_default();
        RetrieveAndGenerateResponse {
            output: GeneratedOutput {
                text: answer.into(),
            },
            citations,
            session_id: None,
        }
    }

    /// Answer every subsequent call with `response`.
    pub async fn set_response(&self, response: RetrieveAndGenerateResponse) {
        *self.response.write().await = Some(response);
    }

    /// Fail every subsequent call with `message`.
    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.failure.write().await = Some(message.into());
    }

    /// `(question, knowledge_base_id)` pairs received so far.
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl KnowledgeBase for InMemoryKnowledgeBase {
    async fn retrieve_and_generate(
        &self,
        question: &str,
        knowledge_base_id: &str,
    ) -> DomainResult<RetrieveAndGenerateResponse> {
        self.calls
            .write()
            .await
            .push((question.to_string(), knowledge_base_id.to_string()));

        if let Some(message) = self.failure.read().await.clone() {
            return Err(DomainError::KnowledgeBase(message));
        }

        self.response.read().await.clone().ok_or_else(|| {
            DomainError::KnowledgeBase("no response configured for knowledge base".to_string())
        })
    }
}
