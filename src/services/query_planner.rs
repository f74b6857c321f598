//! Turns a question into a short natural-language retrieval plan.

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::errors::DomainResult;
use crate::domain::models::{CompletionRequest, KnowledgeDomainConfig};
use crate::domain::ports::CompletionProvider;
use crate::services::prompts;

/// Query planning agent.
pub struct QueryPlanner {
    provider: Arc<dyn CompletionProvider>,
}

impl QueryPlanner {
    /// Create a planner over `provider`.
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Plan naming the tables, columns and joins relevant to `question`.
    ///
    /// One completion call, no retries.
    #[instrument(skip(self, question, domain), fields(domain = %domain.name))]
    pub async fn plan(&self, question: &str, domain: &KnowledgeDomainConfig) -> DomainResult<String> {
        let request = CompletionRequest::new(
            prompts::query_planner(&domain.schema),
            prompts::query_planner_input(question),
        );
        let plan = self.provider.complete(request).await?.trim().to_string();
        debug!(plan_len = plan.len(), "query plan created");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::llm::{MockCompletionProvider, MockResponse};
    use crate::domain::models::Config;

    #[tokio::test]
    async fn test_plan_uses_domain_schema() {
        let mock = Arc::new(MockCompletionProvider::with_default_response(
            MockResponse::success("  Join salesitems with products on product_id.  "),
        ));
        let planner = QueryPlanner::new(mock.clone());
        let config = Config::default();

        let plan = planner
            .plan("Revenue by category?", &config.knowledge_domains[0])
            .await
            .unwrap();

        assert_eq!(plan, "Join salesitems with products on product_id.");
        let requests = mock.requests().await;
        assert!(requests[0].system_prompt.contains("dataset_fashion_store_products"));
        assert!(requests[0].user_prompt.ends_with("Revenue by category?"));
    }
}
