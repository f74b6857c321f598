//! Client for the knowledge base's retrieve-and-generate call.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::RetrievalResult;
use crate::domain::ports::KnowledgeBase;

/// Error body returned for an event without a question.
pub const NO_QUESTION_ERROR: &str = "No question provided";

/// Thin service over [`KnowledgeBase`] that extracts answer and SQL.
pub struct KnowledgeRetrievalClient {
    knowledge_base: Arc<dyn KnowledgeBase>,
}

impl KnowledgeRetrievalClient {
    /// Wrap a knowledge base port.
    pub fn new(knowledge_base: Arc<dyn KnowledgeBase>) -> Self {
        Self { knowledge_base }
    }

    /// Ask the knowledge base once.
    ///
    /// The answer is the generated text; the SQL is the query of the first
    /// citation reference carrying an SQL location.
    #[instrument(skip(self, question))]
    pub async fn retrieve(
        &self,
        question: &str,
        knowledge_base_id: &str,
    ) -> DomainResult<RetrievalResult> {
        let response = self
            .knowledge_base
            .retrieve_and_generate(question, knowledge_base_id)
            .await?;
        let sql = response.first_sql().map(str::to_string);
        debug!(has_sql = sql.is_some(), "knowledge base answered");
        Ok(RetrievalResult::Answer {
            answer: response.output.text,
            sql,
        })
    }

    /// Handle an action-group event carrying the question as a
    /// `requestBody.content["application/json"].properties` entry.
    pub async fn handle_event(
        &self,
        event: &Value,
        knowledge_base_id: &str,
    ) -> DomainResult<RetrievalResult> {
        match question_from_event(event) {
            Some(question) => self.retrieve(question, knowledge_base_id).await,
            None => {
                warn!("retrieval event carried no question");
                Ok(RetrievalResult::Error {
                    error: NO_QUESTION_ERROR.to_string(),
                })
            }
        }
    }
}

/// Wrap a question in the action-group event shape.
pub fn question_event(question: &str) -> Value {
    json!({
        "requestBody": {
            "content": {
                "application/json": {
                    "properties": [{"name": "question", "value": question}]
                }
            }
        }
    })
}

fn question_from_event(event: &Value) -> Option<&str> {
    event
        .pointer("/requestBody/content/application~1json/properties")?
        .as_array()?
        .iter()
        .find(|prop| prop.get("name").and_then(Value::as_str) == Some("question"))?
        .get("value")?
        .as_str()
        .filter(|q| !q.trim().is_empty())
}
