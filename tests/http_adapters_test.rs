//! HTTP adapters against mock servers.

use insightflow::adapters::dashboard::HttpDashboardHost;
use insightflow::adapters::knowledge_base::HttpKnowledgeBase;
use insightflow::adapters::llm::AnthropicCompletionProvider;
use insightflow::domain::errors::DomainError;
use insightflow::domain::models::{
    CompletionRequest, CreateAnalysisOutcome, DashboardConfig, DashboardDefinition,
    KnowledgeBaseConfig, LlmConfig,
};
use insightflow::domain::ports::{CompletionProvider, DashboardHost, KnowledgeBase};
use mockito::{Matcher, Server};
use serde_json::json;

fn llm_config(base_url: String) -> LlmConfig {
    LlmConfig {
        base_url,
        api_key: Some("test-api-key".to_string()),
        ..LlmConfig::default()
    }
}

fn kb_config(base_url: String) -> KnowledgeBaseConfig {
    KnowledgeBaseConfig {
        base_url,
        api_token: Some("kb-token".to_string()),
        ..KnowledgeBaseConfig::default()
    }
}

fn dashboard_config(base_url: String) -> DashboardConfig {
    DashboardConfig {
        base_url,
        api_token: Some("dash-token".to_string()),
        account_id: "123456789012".to_string(),
        ..DashboardConfig::default()
    }
}

fn definition() -> DashboardDefinition {
    DashboardDefinition::new(json!({
        "Definition": {
            "DataSetIdentifierDeclarations": [{"Identifier": "ds", "DataSetArn": "arn:ds"}],
            "Sheets": []
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn test_completion_success() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .match_header("x-api-key", "test-api-key")
        .match_header("anthropic-version", "2023-06-01")
        .match_body(Matcher::PartialJson(json!({
            "system": "You are a database query planner.",
            "max_tokens": 64,
            "messages": [{"role": "user", "content": [{"type": "text", "text": "plan this"}]}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "msg_01",
                "type": "message",
                "role": "assistant",
                "content": [
                    {"type": "text", "text": "Join sales"},
                    {"type": "tool_use", "id": "t", "name": "x", "input": {}},
                    {"type": "text", "text": "to products."}
                ],
                "model": "claude",
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 12, "output_tokens": 4}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let provider = AnthropicCompletionProvider::new(llm_config(server.url())).unwrap();
    let text = provider
        .complete(
            CompletionRequest::new("You are a database query planner.", "plan this")
                .with_max_tokens(64),
        )
        .await
        .unwrap();

    assert_eq!(text, "Join sales\nto products.");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_completion_error_status() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/messages")
        .with_status(529)
        .with_body(r#"{"type":"error","error":{"type":"overloaded_error"}}"#)
        .create_async()
        .await;

    let provider = AnthropicCompletionProvider::new(llm_config(server.url())).unwrap();
    let err = provider
        .complete(CompletionRequest::new("system", "hello"))
        .await
        .unwrap_err();

    match err {
        DomainError::Completion(message) => {
            assert!(message.contains("529"));
            assert!(message.contains("overloaded_error"));
        }
        other => panic!("expected a completion error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_retrieve_and_generate_request_shape() {
    let mut server = Server::new_async().await;
    let config = kb_config(server.url());
    let mock = server
        .mock("POST", "/retrieveAndGenerate")
        .match_header("authorization", "Bearer kb-token")
        .match_body(Matcher::Json(json!({
            "input": {"text": "Revenue by category?"},
            "retrieveAndGenerateConfiguration": {
                "type": "KNOWLEDGE_BASE",
                "knowledgeBaseConfiguration": {
                    "knowledgeBaseId": "QCQ10YU9FE",
                    "modelArn": config.model_arn
                }
            }
        })))
        .with_status(200)
        .with_body(
            json!({
                "output": {"text": "Accessories lead."},
                "citations": [{"retrievedReferences": [
                    {"location": {"type": "SQL", "sqlLocation": {"query": "SELECT 1"}}}
                ]}],
                "sessionId": "abc"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let kb = HttpKnowledgeBase::new(config).unwrap();
    let response = kb
        .retrieve_and_generate("Revenue by category?", "QCQ10YU9FE")
        .await
        .unwrap();

    assert_eq!(response.output.text, "Accessories lead.");
    assert_eq!(response.first_sql(), Some("SELECT 1"));
    assert_eq!(response.session_id.as_deref(), Some("abc"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_retrieve_and_generate_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/retrieveAndGenerate")
        .with_status(403)
        .with_body("AccessDeniedException")
        .create_async()
        .await;

    let kb = HttpKnowledgeBase::new(kb_config(server.url())).unwrap();
    let err = kb.retrieve_and_generate("q", "id").await.unwrap_err();

    assert!(matches!(err, DomainError::KnowledgeBase(ref m) if m.contains("403")));
    assert!(err.is_external());
}

#[tokio::test]
async fn test_create_analysis_and_grant_permissions() {
    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/accounts/123456789012/analyses/Q3RevenueReview")
        .match_header("authorization", "Bearer dash-token")
        .match_body(Matcher::PartialJson(json!({
            "Name": "Q3 Revenue Review",
            "Definition": {"Sheets": []}
        })))
        .with_status(202)
        .with_body(r#"{"AnalysisId": "Q3RevenueReview", "CreationStatus": "CREATION_IN_PROGRESS"}"#)
        .create_async()
        .await;
    let grant = server
        .mock("PUT", "/accounts/123456789012/analyses/Q3RevenueReview/permissions")
        .match_body(Matcher::PartialJson(json!({
            "GrantPermissions": [{
                "Principal": DashboardConfig::default().principal_arn
            }]
        })))
        .with_status(200)
        .with_body(r#"{"AnalysisId": "Q3RevenueReview", "Status": 200}"#)
        .create_async()
        .await;

    let host = HttpDashboardHost::new(dashboard_config(server.url())).unwrap();
    let outcome = host
        .create_analysis(&definition(), "Q3 Revenue Review", "Q3RevenueReview")
        .await
        .unwrap();
    assert!(outcome.is_success());

    let granted = host.grant_permissions("Q3RevenueReview").await.unwrap();
    assert_eq!(granted["Status"], 200);

    create.assert_async().await;
    grant.assert_async().await;
}

#[tokio::test]
async fn test_create_analysis_rejected_is_error_outcome() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/accounts/123456789012/analyses/Sales")
        .with_status(409)
        .with_body("ResourceExistsException")
        .create_async()
        .await;

    let host = HttpDashboardHost::new(dashboard_config(server.url())).unwrap();
    let outcome = host
        .create_analysis(&definition(), "Sales", "Sales")
        .await
        .unwrap();

    match outcome {
        CreateAnalysisOutcome::Error { message } => {
            assert!(message.contains("409"));
            assert!(message.contains("ResourceExistsException"));
        }
        other => panic!("expected an error outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_analysis_server_error_is_err() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/accounts/123456789012/analyses/Sales")
        .with_status(500)
        .create_async()
        .await;

    let host = HttpDashboardHost::new(dashboard_config(server.url())).unwrap();
    let err = host
        .create_analysis(&definition(), "Sales", "Sales")
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::DashboardHost(_)));
}

#[tokio::test]
async fn test_list_and_delete_analyses() {
    let mut server = Server::new_async().await;
    let _list = server
        .mock("GET", "/accounts/123456789012/analyses")
        .with_status(200)
        .with_body(
            json!({
                "AnalysisSummaryList": [{
                    "AnalysisId": "Q3RevenueReview",
                    "Name": "Q3 Revenue Review",
                    "Arn": "arn:analysis",
                    "Status": "CREATION_SUCCESSFUL"
                }],
                "Status": 200
            })
            .to_string(),
        )
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/accounts/123456789012/analyses/Q3RevenueReview")
        .with_status(200)
        .with_body(r#"{"AnalysisId": "Q3RevenueReview", "Status": 200}"#)
        .create_async()
        .await;

    let host = HttpDashboardHost::new(dashboard_config(server.url())).unwrap();
    let analyses = host.list_analyses().await.unwrap();
    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0].analysis_id, "Q3RevenueReview");
    assert_eq!(analyses[0].status.as_deref(), Some("CREATION_SUCCESSFUL"));

    host.delete_analysis("Q3RevenueReview").await.unwrap();
    delete.assert_async().await;
}
