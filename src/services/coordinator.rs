//! Turn routing across the insight, visualization and publishing workflows.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CompletionRequest, ConversationTurn, TurnReply, WorkflowState};
use crate::domain::ports::CompletionProvider;
use crate::services::{
    extract_json_from_response, failure_reply, prompts, DashboardGateway, DefinitionGenerator,
    InsightResponder, SessionId, SessionRegistry, VisualizationPlanner,
};

/// Transcript lines shown to the turn router.
const ROUTER_TRANSCRIPT_TURNS: usize = 6;

/// Workflow a user turn is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnIntent {
    /// Question or SQL for the knowledge base
    Insight,
    /// Visualization plan and dashboard definition for the latest context
    Visualize,
    /// Hosting request: create, list, update or retry an analysis
    Publish,
}

impl TurnIntent {
    /// Keyword routing used when the classifier is unavailable.
    pub fn from_keywords(text: &str) -> Self {
        let lower = text.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        if has(&["analysis", "analyses", "publish", "dashboard", "retry"]) {
            Self::Publish
        } else if has(&["visual", "chart", "plot", "graph"]) {
            Self::Visualize
        } else {
            Self::Insight
        }
    }
}

#[derive(Debug, Deserialize)]
struct RouterVerdict {
    intent: TurnIntent,
}

/// Top-level dispatcher for conversation turns.
///
/// Each turn is classified by the completion service (falling back to
/// keyword routing), run against the session's [`WorkflowState`] and
/// recorded in the session transcript. Turns of one session are serialized
/// by the session lock; different sessions run concurrently.
pub struct Coordinator {
    provider: Arc<dyn CompletionProvider>,
    sessions: SessionRegistry,
    insight: InsightResponder,
    planner: VisualizationPlanner,
    generator: DefinitionGenerator,
    gateway: DashboardGateway,
}

impl Coordinator {
    /// Create a coordinator with an empty session registry.
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        insight: InsightResponder,
        planner: VisualizationPlanner,
        generator: DefinitionGenerator,
        gateway: DashboardGateway,
    ) -> Self {
        Self {
            provider,
            sessions: SessionRegistry::new(),
            insight,
            planner,
            generator,
            gateway,
        }
    }

    /// Registry holding per-session workflow state.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Run one user turn in `session`. Errors surface as apology text.
    #[instrument(skip(self, text), fields(session = %session))]
    pub async fn handle_turn(&self, session: &SessionId, text: &str) -> TurnReply {
        let state = self.sessions.get_or_create(session).await;
        let mut state = state.lock().await;
        self.run_turn(&mut state, text).await
    }

    /// Clear the state of `session`. Returns whether it existed.
    pub async fn reset(&self, session: &SessionId) -> bool {
        self.sessions.reset(session).await
    }

    /// Route and run one turn against `state`, recording both sides in the
    /// transcript.
    ///
    /// Never fails: every error ends as an apology in a `Text` reply and the
    /// state stays usable for the next turn.
    pub async fn run_turn(&self, state: &mut WorkflowState, text: &str) -> TurnReply {
        let intent = self.classify(state, text).await;
        state.push_turn(ConversationTurn::user(text));

        let reply = match intent {
            TurnIntent::Insight => TurnReply::Text(self.insight.respond(state, text).await.reply()),
            TurnIntent::Visualize => self.visualize(state, text).await,
            TurnIntent::Publish => TurnReply::Text(self.gateway.handle(state, text).await),
        };

        let summary = match &reply {
            TurnReply::Text(text) => text.clone(),
            TurnReply::Definition(_) => "Prepared a dashboard definition.".to_string(),
        };
        state.push_turn(ConversationTurn::assistant(summary));
        reply
    }

    async fn classify(&self, state: &WorkflowState, text: &str) -> TurnIntent {
        match self.route(state, text).await {
            Ok(intent) => {
                info!(?intent, "turn routed");
                intent
            }
            Err(e) => {
                let intent = TurnIntent::from_keywords(text);
                warn!(error = %e, ?intent, "turn router failed, using keyword routing");
                intent
            }
        }
    }

    async fn route(&self, state: &WorkflowState, text: &str) -> DomainResult<TurnIntent> {
        let input =
            prompts::turn_router_input(&state.recent_transcript(ROUTER_TRANSCRIPT_TURNS), text);
        let response = self
            .provider
            .complete(CompletionRequest::new(prompts::turn_router(), input).with_max_tokens(64))
            .await?;
        let verdict: RouterVerdict = serde_json::from_str(&extract_json_from_response(&response))
            .map_err(|e| DomainError::MalformedOutput(format!("turn router reply: {e}")))?;
        Ok(verdict.intent)
    }

    async fn visualize(&self, state: &mut WorkflowState, text: &str) -> TurnReply {
        let planned = match self.planner.plan(state, text).await {
            Ok(planned) => planned,
            Err(e) => {
                return TurnReply::Text(failure_reply("creating the visualization plan", &e));
            }
        };

        match self.generator.generate(&planned.plan).await {
            Ok(definition) => {
                state.store_definition(definition.clone());
                TurnReply::Definition(definition)
            }
            Err(e) => TurnReply::Text(failure_reply("preparing the json definition", &e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::dashboard::InMemoryDashboardHost;
    use crate::adapters::knowledge_base::InMemoryKnowledgeBase;
    use crate::adapters::llm::{MockCompletionProvider, MockResponse};
    use crate::domain::models::{
        Config, GenerationMode, InsightContextEntry, InsightResponse, DATASET_PLACEHOLDER,
    };
    use crate::services::KnowledgeRetrievalClient;

    const SQL: &str = "SELECT p.category, SUM(si.item_total) AS total_revenue \
        FROM salesitems si JOIN products p ON si.product_id = p.product_id GROUP BY p.category";

    const PLAN: &str = "VISUAL_TYPE: BarChartVisual
FIELD_WELLS_TYPE: BarChartAggregatedFieldWells
DIMENSION_FIELDS: [\"category\"]
MEASURE_FIELDS: [\"item_total\"]
AGGREGATION_FUNCTION_REQUIRED: True
AGGREGATION_FUNCTIONS: \"AggregationFunction\": {\"SimpleNumericalAggregation\": \"SUM\"}
SORT_TYPE: FieldSort
SORT_DIRECTION: DESC
CALCULATED_FIELDS_REQUIRED: False
SUMMARY: Revenue per category.";

    struct Harness {
        coordinator: Coordinator,
        mock: Arc<MockCompletionProvider>,
        host: Arc<InMemoryDashboardHost>,
    }

    async fn harness() -> Harness {
        let config = Config::default();
        let mock = Arc::new(MockCompletionProvider::new());
        mock.on_system_prompt(
            prompts::QUERY_PLANNER_ROLE,
            MockResponse::success("Sum item_total per category."),
        )
        .await;
        mock.on_system_prompt(
            prompts::SQL_ANALYZER_ROLE,
            MockResponse::success(r#"{"column_names": ["category", "item_total"], "table_names": ["salesitems", "products"]}"#),
        )
        .await;
        mock.on_system_prompt(prompts::VISUAL_PLANNER_ROLE, MockResponse::success(PLAN))
            .await;

        let kb = Arc::new(InMemoryKnowledgeBase::answering("Accessories lead.", Some(SQL)));
        let host = Arc::new(InMemoryDashboardHost::new());
        let coordinator = Coordinator::new(
            mock.clone(),
            InsightResponder::new(
                mock.clone(),
                KnowledgeRetrievalClient::new(kb),
                config.knowledge_domains.clone(),
            ),
            VisualizationPlanner::new(mock.clone()),
            DefinitionGenerator::new(mock.clone(), GenerationMode::Template, config.dataset.clone()),
            DashboardGateway::new(
                mock.clone(),
                host.clone(),
                config.dashboard.default_analysis_name.clone(),
            ),
        );
        Harness {
            coordinator,
            mock,
            host,
        }
    }

    async fn route_next(mock: &MockCompletionProvider, intent: &str) {
        mock.push_response(MockResponse::success(format!(r#"{{"intent": "{intent}"}}"#)))
            .await;
    }

    #[test]
    fn test_keyword_routing() {
        assert_eq!(TurnIntent::from_keywords("Plot that as a chart"), TurnIntent::Visualize);
        assert_eq!(TurnIntent::from_keywords("list my analyses"), TurnIntent::Publish);
        assert_eq!(TurnIntent::from_keywords("What sold best?"), TurnIntent::Insight);
    }

    #[tokio::test]
    async fn test_full_conversation() {
        let h = harness().await;
        let session = SessionId::from("s1");

        route_next(&h.mock, "insight").await;
        let reply = h.coordinator.handle_turn(&session, "Revenue by category?").await;
        assert!(reply.as_text().contains("Accessories lead."));

        route_next(&h.mock, "visualize").await;
        let reply = h.coordinator.handle_turn(&session, "Chart that").await;
        let TurnReply::Definition(definition) = reply else {
            panic!("expected a definition, got {reply:?}");
        };
        assert_eq!(definition.placeholder_count(), 0);
        assert!(!definition.to_pretty_string().contains(DATASET_PLACEHOLDER));

        route_next(&h.mock, "publish").await;
        h.mock
            .push_response(MockResponse::success(
                r#"{"action": "create", "analysis_name": "Revenue Review"}"#,
            ))
            .await;
        let reply = h.coordinator.handle_turn(&session, "Publish it as Revenue Review").await;
        assert!(reply.as_text().starts_with("Created analysis 'Revenue Review'"));
        assert!(h.host.get("RevenueReview").await.is_some());

        let state = h.coordinator.sessions().snapshot(&session).await.unwrap();
        assert_eq!(state.transcript.len(), 6);
        assert!(state.action.is_idle());
    }

    #[tokio::test]
    async fn test_router_sees_transcript() {
        let h = harness().await;
        let session = SessionId::from("s1");

        route_next(&h.mock, "insight").await;
        h.coordinator.handle_turn(&session, "Revenue by category?").await;
        route_next(&h.mock, "insight").await;
        h.coordinator.handle_turn(&session, "And by channel?").await;

        let routed = h.mock.requests_matching(prompts::TURN_ROUTER_ROLE).await;
        assert_eq!(routed.len(), 2);
        assert!(routed[1].user_prompt.contains("user: Revenue by category?"));
        assert!(routed[1].user_prompt.ends_with("Latest message: And by channel?"));
    }

    #[tokio::test]
    async fn test_router_failure_falls_back_to_keywords() {
        let h = harness().await;
        let session = SessionId::from("s1");
        h.mock.push_response(MockResponse::failure("overloaded")).await;

        let reply = h.coordinator.handle_turn(&session, "list my analyses").await;

        // Keyword routing picks the gateway, whose classifier gets no JSON.
        assert!(reply.as_text().starts_with("Sorry, I encountered an error while"));
    }

    #[tokio::test]
    async fn test_visualize_plan_failure_apologizes() {
        let h = harness().await;
        h.mock
            .on_system_prompt(
                prompts::TURN_ROUTER_ROLE,
                MockResponse::success(r#"{"intent": "visualize"}"#),
            )
            .await;
        let mut state = WorkflowState::new();
        state.record_insight(InsightContextEntry::new(
            "q",
            InsightResponse {
                query_plan: None,
                sql: Some(SQL.to_string()),
                answer: "a".to_string(),
            },
        ));
        let coordinator = Coordinator::new(
            h.mock.clone(),
            InsightResponder::new(
                h.mock.clone(),
                KnowledgeRetrievalClient::new(Arc::new(InMemoryKnowledgeBase::new())),
                Config::default().knowledge_domains,
            ),
            VisualizationPlanner::new(Arc::new(MockCompletionProvider::with_default_response(
                MockResponse::success("not a plan"),
            ))),
            DefinitionGenerator::new(
                h.mock.clone(),
                GenerationMode::Template,
                Config::default().dataset,
            ),
            DashboardGateway::new(h.mock.clone(), h.host.clone(), "x"),
        );

        let reply = coordinator.run_turn(&mut state, "chart it").await;

        assert!(reply
            .as_text()
            .starts_with("Sorry, I encountered an error while creating the visualization plan"));
        assert!(state.dashboard_definition.is_none());
        assert_eq!(state.transcript.len(), 2);
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_state() {
        let h = harness().await;
        route_next(&h.mock, "insight").await;
        h.coordinator
            .handle_turn(&SessionId::from("a"), "Revenue by category?")
            .await;

        route_next(&h.mock, "publish").await;
        h.mock
            .push_response(MockResponse::success(r#"{"action": "create", "analysis_name": null}"#))
            .await;
        let reply = h
            .coordinator
            .handle_turn(&SessionId::from("b"), "create an analysis")
            .await;

        assert_eq!(reply.as_text(), crate::services::dashboard_gateway::NO_DEFINITION_ADVISORY);
        assert_eq!(h.host.create_calls().await, 0);
    }
}
