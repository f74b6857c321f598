//! Insight path: plan, retrieve and record context for one question.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CompletionRequest, InsightContextEntry, InsightResponse, KnowledgeDomainConfig,
    RetrievalResult, WorkflowState,
};
use crate::domain::ports::CompletionProvider;
use crate::services::knowledge_retrieval::{question_event, KnowledgeRetrievalClient};
use crate::services::query_planner::QueryPlanner;
use crate::services::{failure_reply, prompts};

const VISUALIZATION_OFFER: &str = "Would you like to see a visualization of this data?";

/// Result of one insight turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsightOutcome {
    /// Answer and SQL recorded.
    Complete {
        /// Entry appended to the context
        entry: InsightContextEntry,
    },
    /// Answer recorded without SQL.
    Partial {
        /// Entry appended to the context
        entry: InsightContextEntry,
    },
    /// Nothing recorded.
    Failed {
        /// Apology shown to the user
        message: String,
    },
}

impl InsightOutcome {
    /// Text shown to the user.
    pub fn reply(&self) -> String {
        match self {
            Self::Complete { entry } => {
                let sql = entry.response.sql.as_deref().unwrap_or_default();
                format!(
                    "{}\n\nSQL used:\n```sql\n{}\n```\n\n{VISUALIZATION_OFFER}",
                    entry.response.answer.trim(),
                    sql.trim()
                )
            }
            Self::Partial { entry } => format!(
                "{}\n\nThe knowledge base did not report the SQL it used, so a visualization \
                 would not be scoped to a query.\n\n{VISUALIZATION_OFFER}",
                entry.response.answer.trim()
            ),
            Self::Failed { message } => message.clone(),
        }
    }

    /// Recorded context entry, absent on failure.
    pub fn entry(&self) -> Option<&InsightContextEntry> {
        match self {
            Self::Complete { entry } | Self::Partial { entry } => Some(entry),
            Self::Failed { .. } => None,
        }
    }
}

/// Whether the text already is a query: starts with `SELECT` or `WITH` as a word.
pub fn is_direct_query(text: &str) -> bool {
    let trimmed = text.trim_start();
    ["SELECT", "WITH"].iter().any(|keyword| {
        trimmed
            .get(..keyword.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
            && trimmed[keyword.len()..]
                .chars()
                .next()
                .map_or(true, |c| c.is_whitespace() || c == '(' || c == '*')
    })
}

/// Input sent to the knowledge base for a planned question.
pub fn combined_input(question: &str, query_plan: &str) -> String {
    format!(" Question: {question} Query Plan: {query_plan}")
}

/// Insight agent.
///
/// Selects a knowledge domain, plans the question against that domain's
/// schema (skipped for direct SQL), queries the knowledge base and records
/// the answer with its SQL in the session context.
pub struct InsightResponder {
    provider: Arc<dyn CompletionProvider>,
    planner: QueryPlanner,
    retrieval: KnowledgeRetrievalClient,
    domains: Vec<KnowledgeDomainConfig>,
}

impl InsightResponder {
    /// `domains` must not be empty; the first is the fallback.
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        retrieval: KnowledgeRetrievalClient,
        domains: Vec<KnowledgeDomainConfig>,
    ) -> Self {
        Self {
            planner: QueryPlanner::new(provider.clone()),
            provider,
            retrieval,
            domains,
        }
    }

    /// Answer `text` and record the retrieval in `state`.
    ///
    /// Failures produce an apology and leave the context untouched.
    #[instrument(skip(self, state, text))]
    pub async fn respond(&self, state: &mut WorkflowState, text: &str) -> InsightOutcome {
        match self.try_respond(text).await {
            Ok((entry, direct)) => {
                state.has_direct_sql_query = direct;
                state.record_insight(entry.clone());
                if entry.is_partial() {
                    warn!("retrieval returned an answer without SQL");
                    InsightOutcome::Partial { entry }
                } else {
                    info!("insight context recorded");
                    InsightOutcome::Complete { entry }
                }
            }
            Err(e) => InsightOutcome::Failed {
                message: failure_reply("retrieving data", &e),
            },
        }
    }

    async fn try_respond(&self, text: &str) -> DomainResult<(InsightContextEntry, bool)> {
        let domain = self.select_domain(text).await?;

        let (query_plan, kb_input, direct) = if is_direct_query(text) {
            (None, text.to_string(), true)
        } else {
            let plan = self.planner.plan(text, domain).await?;
            let input = combined_input(text, &plan);
            (Some(plan), input, false)
        };

        let result = self
            .retrieval
            .handle_event(&question_event(&kb_input), &domain.knowledge_base_id)
            .await?;

        match result {
            RetrievalResult::Answer { answer, sql } => Ok((
                InsightContextEntry::new(
                    text,
                    InsightResponse {
                        query_plan,
                        sql,
                        answer,
                    },
                ),
                direct,
            )),
            RetrievalResult::Error { error } => Err(DomainError::KnowledgeBase(error)),
        }
    }

    /// Pick the knowledge domain for `text`; asks the model only when there
    /// is more than one.
    async fn select_domain(&self, text: &str) -> DomainResult<&KnowledgeDomainConfig> {
        let first = self.domains.first().ok_or_else(|| {
            DomainError::Configuration("no knowledge domains configured".to_string())
        })?;
        if self.domains.len() == 1 {
            return Ok(first);
        }

        let answer = self
            .provider
            .complete(
                CompletionRequest::new(prompts::domain_selector(&self.domains), text)
                    .with_max_tokens(32),
            )
            .await?;
        let answer = answer.trim().trim_matches(['"', '\'', '`', '.']).to_ascii_lowercase();

        let chosen = self
            .domains
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(&answer))
            .or_else(|| {
                self.domains
                    .iter()
                    .find(|d| answer.contains(&d.name.to_ascii_lowercase()))
            });
        match chosen {
            Some(domain) => Ok(domain),
            None => {
                warn!(answer = %answer, fallback = %first.name, "unrecognized knowledge domain");
                Ok(first)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::knowledge_base::InMemoryKnowledgeBase;
    use crate::adapters::llm::{MockCompletionProvider, MockResponse};
    use crate::domain::models::Config;

    const SQL: &str = "SELECT p.category, SUM(si.item_total) AS total_revenue \
        FROM dataset_fashion_store_salesitems si JOIN dataset_fashion_store_products p \
        ON si.product_id = p.product_id GROUP BY p.category";

    async fn responder(
        kb: Arc<InMemoryKnowledgeBase>,
        domains: Vec<KnowledgeDomainConfig>,
    ) -> (InsightResponder, Arc<MockCompletionProvider>) {
        let mock = Arc::new(MockCompletionProvider::new());
        mock.on_system_prompt(
            prompts::QUERY_PLANNER_ROLE,
            MockResponse::success("Join salesitems to products and sum item_total per category."),
        )
        .await;
        let responder = InsightResponder::new(
            mock.clone(),
            KnowledgeRetrievalClient::new(kb),
            domains,
        );
        (responder, mock)
    }

    #[test]
    fn test_is_direct_query() {
        assert!(is_direct_query("SELECT * FROM t"));
        assert!(is_direct_query("  select count(*) from t"));
        assert!(is_direct_query("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(is_direct_query("SELECT*FROM t"));
        assert!(!is_direct_query("Without discounts, what sold best?"));
        assert!(!is_direct_query("Selection of top products?"));
        assert!(!is_direct_query("What is revenue?"));
    }

    #[test]
    fn test_combined_input_contains_both_verbatim() {
        let input = combined_input("Revenue by category?", "Use salesitems.");
        assert_eq!(input, " Question: Revenue by category? Query Plan: Use salesitems.");
    }

    #[tokio::test]
    async fn test_planned_question_records_full_entry() {
        let kb = Arc::new(InMemoryKnowledgeBase::answering("Accessories lead.", Some(SQL)));
        let (responder, _) = responder(kb.clone(), Config::default().knowledge_domains).await;
        let mut state = WorkflowState::new();

        let outcome = responder.respond(&mut state, "Revenue by category?").await;

        assert!(matches!(outcome, InsightOutcome::Complete { .. }));
        assert!(outcome.reply().contains("```sql"));
        assert!(outcome.reply().ends_with(VISUALIZATION_OFFER));
        let entry = state.latest_insight().unwrap();
        assert_eq!(entry.question, "Revenue by category?");
        assert_eq!(entry.response.sql.as_deref(), Some(SQL));
        assert!(entry.response.query_plan.is_some());
        assert!(!state.has_direct_sql_query);

        let (sent, kb_id) = kb.calls().await.remove(0);
        assert!(sent.contains("Question: Revenue by category?"));
        assert!(sent.contains("Query Plan: Join salesitems to products"));
        assert_eq!(kb_id, "QCQ10YU9FE");
    }

    #[tokio::test]
    async fn test_direct_query_skips_planner() {
        let kb = Arc::new(InMemoryKnowledgeBase::answering("42 rows.", Some(SQL)));
        let (responder, mock) = responder(kb.clone(), Config::default().knowledge_domains).await;
        let mut state = WorkflowState::new();

        responder.respond(&mut state, SQL).await;

        assert!(mock.requests().await.is_empty());
        assert_eq!(kb.calls().await[0].0, SQL);
        assert!(state.has_direct_sql_query);
        assert!(state.latest_insight().unwrap().response.query_plan.is_none());
    }

    #[tokio::test]
    async fn test_answer_without_sql_is_partial() {
        let kb = Arc::new(InMemoryKnowledgeBase::answering("Roughly even.", None));
        let (responder, _) = responder(kb, Config::default().knowledge_domains).await;
        let mut state = WorkflowState::new();

        let outcome = responder.respond(&mut state, "How are channels doing?").await;

        assert!(matches!(outcome, InsightOutcome::Partial { .. }));
        assert_eq!(state.insight_context.len(), 1);
        assert!(state.latest_insight().unwrap().is_partial());
    }

    #[tokio::test]
    async fn test_failure_records_nothing() {
        let kb = Arc::new(InMemoryKnowledgeBase::new());
        kb.fail_with("throttled").await;
        let (responder, _) = responder(kb, Config::default().knowledge_domains).await;
        let mut state = WorkflowState::new();

        let outcome = responder.respond(&mut state, "Revenue?").await;

        match outcome {
            InsightOutcome::Failed { message } => {
                assert!(message.starts_with("Sorry, I encountered an error while retrieving data"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(state.insight_context.is_empty());
    }

    #[tokio::test]
    async fn test_planner_failure_records_nothing() {
        let kb = Arc::new(InMemoryKnowledgeBase::answering("x", Some(SQL)));
        let mock = Arc::new(MockCompletionProvider::with_default_response(
            MockResponse::failure("overloaded"),
        ));
        let responder = InsightResponder::new(
            mock,
            KnowledgeRetrievalClient::new(kb.clone()),
            Config::default().knowledge_domains,
        );
        let mut state = WorkflowState::new();

        let outcome = responder.respond(&mut state, "Revenue?").await;

        assert!(matches!(outcome, InsightOutcome::Failed { .. }));
        assert!(kb.calls().await.is_empty());
        assert!(state.insight_context.is_empty());
    }

    #[tokio::test]
    async fn test_multiple_domains_route_by_model_choice() {
        let mut domains = Config::default().knowledge_domains;
        domains.push(KnowledgeDomainConfig {
            name: "scorecard".to_string(),
            description: "Business unit scorecard targets and actuals".to_string(),
            knowledge_base_id: "SCORE1".to_string(),
            schema: "- scorecard (bu, metric, target, actual)".to_string(),
        });
        let kb = Arc::new(InMemoryKnowledgeBase::answering("On target.", Some("SELECT 1")));
        let (responder, mock) = responder(kb.clone(), domains).await;
        mock.on_system_prompt(prompts::DOMAIN_SELECTOR_ROLE, MockResponse::success("Scorecard."))
            .await;
        let mut state = WorkflowState::new();

        responder
            .respond(&mut state, "Is the retail BU on target?")
            .await;

        assert_eq!(kb.calls().await[0].1, "SCORE1");
        let planner_calls = mock.requests_matching(prompts::QUERY_PLANNER_ROLE).await;
        assert!(planner_calls[0].system_prompt.contains("scorecard (bu, metric"));
    }
}
