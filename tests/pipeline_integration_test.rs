//! End-to-end conversations through the coordinator on in-memory adapters.

mod common;

use common::{harness, ANSWER, SQL};
use insightflow::adapters::knowledge_base::InMemoryKnowledgeBase;
use insightflow::adapters::llm::MockResponse;
use insightflow::domain::models::{
    ActionState, GenerationMode, HostingAction, InsightContextEntry, InsightResponse, TurnReply,
    VisualizationPlan, DATASET_PLACEHOLDER,
};
use insightflow::services::definition_generator::fill_template;
use insightflow::services::dashboard_gateway::NO_DEFINITION_ADVISORY;
use insightflow::services::{prompts, SessionId};
use serde_json::Value;

fn definition_of(reply: TurnReply) -> Value {
    match reply {
        TurnReply::Definition(definition) => definition.into_value(),
        TurnReply::Text(text) => panic!("expected a definition, got text: {text}"),
    }
}

#[tokio::test]
async fn test_retrieval_input_carries_question_and_plan() {
    let h = harness(GenerationMode::Template).await;
    h.route("insight").await;

    let reply = h
        .coordinator
        .handle_turn(&SessionId::from("s"), "Which category earns the most?")
        .await;

    assert!(reply.as_text().starts_with(ANSWER));
    let (question, kb_id) = h.knowledge_base.calls().await.remove(0);
    assert!(question.contains("Question: Which category earns the most?"));
    assert!(question.contains(&format!("Query Plan: {}", common::QUERY_PLAN)));
    assert_eq!(kb_id, h.config.knowledge_domains[0].knowledge_base_id);
}

#[tokio::test]
async fn test_bar_chart_scenario() {
    let h = harness(GenerationMode::Template).await;
    let session = SessionId::from("bar");

    h.route("insight").await;
    h.coordinator.handle_turn(&session, "Revenue by category?").await;
    h.route("visualize").await;
    let document =
        definition_of(h.coordinator.handle_turn(&session, "Show that as a bar chart").await);

    let definition = &document["Definition"];
    let visuals = definition["Sheets"][0]["Visuals"].as_array().unwrap();
    assert_eq!(visuals.len(), 1);
    let bar = &visuals[0]["BarChartVisual"];
    let wells = &bar["ChartConfiguration"]["FieldWells"]["BarChartAggregatedFieldWells"];

    let categories = wells["Category"].as_array().unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0]["CategoricalDimensionField"]["Column"]["ColumnName"], "category");

    let values = wells["Values"].as_array().unwrap();
    assert_eq!(values.len(), 1);
    let measure = &values[0]["NumericalMeasureField"];
    assert_eq!(measure["Column"]["ColumnName"], "item_total", "alias resolved to column");
    assert_eq!(measure["AggregationFunction"]["SimpleNumericalAggregation"], "SUM");

    assert_eq!(definition["CalculatedFields"].as_array().unwrap().len(), 0);
    assert_eq!(
        definition["DataSetIdentifierDeclarations"][0]["DataSetArn"],
        h.config.dataset.arn.as_str()
    );
    assert!(!document.to_string().contains(DATASET_PLACEHOLDER));
}

#[tokio::test]
async fn test_model_mode_scenario() {
    let h = harness(GenerationMode::Model).await;
    let session = SessionId::from("model");
    let filled = fill_template(&VisualizationPlan::parse(common::BAR_PLAN).unwrap());
    h.provider
        .on_system_prompt(
            prompts::DEFINITION_GENERATOR_ROLE,
            MockResponse::success(format!("```json\n{filled}\n```")),
        )
        .await;

    h.route("insight").await;
    h.coordinator.handle_turn(&session, "Revenue by category?").await;
    h.route("visualize").await;
    let document = definition_of(h.coordinator.handle_turn(&session, "Chart it").await);

    assert!(!document.to_string().contains(DATASET_PLACEHOLDER));
    let generator_calls = h
        .provider
        .requests_matching(prompts::DEFINITION_GENERATOR_ROLE)
        .await;
    assert_eq!(generator_calls.len(), 1);
    assert!(generator_calls[0].user_prompt.contains("BarChartVisual"));
}

#[tokio::test]
async fn test_citations_without_sql_record_partial_context() {
    let h = harness(GenerationMode::Template).await;
    h.knowledge_base
        .set_response(InMemoryKnowledgeBase::response("Sales are flat.", None))
        .await;
    let session = SessionId::from("partial");

    h.route("insight").await;
    let reply = h.coordinator.handle_turn(&session, "How are sales?").await;

    assert!(reply.as_text().starts_with("Sales are flat."));
    let state = h.coordinator.sessions().snapshot(&session).await.unwrap();
    let entry = state.latest_insight().unwrap();
    assert!(entry.is_partial());
    assert_eq!(entry.response.sql, None);
    assert_eq!(entry.response.answer, "Sales are flat.");
}

#[tokio::test]
async fn test_create_without_definition_never_calls_host() {
    let h = harness(GenerationMode::Template).await;
    h.publish("create", Some("Q3 Revenue Review")).await;

    let reply = h
        .coordinator
        .handle_turn(&SessionId::from("nodef"), "Create the analysis Q3 Revenue Review")
        .await;

    assert_eq!(reply.as_text(), NO_DEFINITION_ADVISORY);
    assert_eq!(h.host.create_calls().await, 0);
}

#[tokio::test]
async fn test_publish_derives_id_and_retries_after_failure() {
    let h = harness(GenerationMode::Template).await;
    let session = SessionId::from("publish");

    h.route("insight").await;
    h.coordinator.handle_turn(&session, "Revenue by category?").await;
    h.route("visualize").await;
    h.coordinator.handle_turn(&session, "Chart it").await;

    h.host.fail_creates(Some("service unavailable".to_string())).await;
    h.publish("create", Some("Q3 Revenue Review")).await;
    let reply = h
        .coordinator
        .handle_turn(&session, "Publish it as Q3 Revenue Review")
        .await;
    assert!(reply.as_text().starts_with("Sorry, I encountered an error while"));
    let state = h.coordinator.sessions().snapshot(&session).await.unwrap();
    assert!(matches!(
        state.action,
        ActionState::Failed { action: HostingAction::Create, .. }
    ));

    h.host.fail_creates(None).await;
    h.publish("retry", None).await;
    let reply = h.coordinator.handle_turn(&session, "try again").await;

    assert!(reply.as_text().contains("Q3RevenueReview"), "{}", reply.as_text());
    let stored = h.host.get("Q3RevenueReview").await.unwrap();
    assert_eq!(stored.name, "Q3 Revenue Review");
    assert!(stored.permissions_granted);
    assert_eq!(stored.definition.placeholder_count(), 0);

    let state = h.coordinator.sessions().snapshot(&session).await.unwrap();
    assert!(state.action.is_idle());
}

#[tokio::test]
async fn test_direct_sql_query_flag() {
    let h = harness(GenerationMode::Template).await;
    let session = SessionId::from("direct");

    h.route("insight").await;
    h.coordinator.handle_turn(&session, SQL).await;

    let state = h.coordinator.sessions().snapshot(&session).await.unwrap();
    assert!(state.has_direct_sql_query);
    assert!(h
        .provider
        .requests_matching(prompts::QUERY_PLANNER_ROLE)
        .await
        .is_empty());
}

#[tokio::test]
async fn test_reset_clears_context() {
    let h = harness(GenerationMode::Template).await;
    let session = SessionId::from("reset");
    h.route("insight").await;
    h.coordinator.handle_turn(&session, "Revenue by category?").await;

    assert!(h.coordinator.reset(&session).await);

    let state = h.coordinator.sessions().snapshot(&session).await.unwrap();
    assert!(state.insight_context.is_empty());
    assert!(state.transcript.is_empty());
}

#[tokio::test]
async fn test_run_turn_on_prepared_state() {
    let h = harness(GenerationMode::Template).await;
    let mut state = insightflow::WorkflowState::new();
    state.record_insight(InsightContextEntry::new(
        "Revenue by category?",
        InsightResponse {
            query_plan: None,
            sql: Some(SQL.to_string()),
            answer: ANSWER.to_string(),
        },
    ));
    h.route("visualize").await;

    let reply = h.coordinator.run_turn(&mut state, "bar chart please").await;

    assert!(matches!(reply, TurnReply::Definition(_)));
    assert!(state.dashboard_definition.is_some());
    assert!(state.visualization_plan.is_some());
}

#[test]
fn test_sniff_matches_definition_replies() {
    let text = r#"{"Definition": {"Sheets": []}}"#;
    assert!(matches!(TurnReply::sniff(text), TurnReply::Definition(_)));
    assert!(matches!(TurnReply::sniff(ANSWER), TurnReply::Text(_)));
}
