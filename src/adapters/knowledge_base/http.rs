//! HTTP client for the retrieve-and-generate endpoint.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{KnowledgeBaseConfig, RetrieveAndGenerateResponse};
use crate::domain::ports::KnowledgeBase;

#[derive(Debug, Serialize)]
struct RetrieveAndGenerateRequest<'a> {
    input: TextInput<'a>,
    #[serde(rename = "retrieveAndGenerateConfiguration")]
    configuration: RetrieveAndGenerateConfiguration<'a>,
}

#[derive(Debug, Serialize)]
struct TextInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct RetrieveAndGenerateConfiguration<'a> {
    #[serde(rename = "type")]
    config_type: &'static str,
    #[serde(rename = "knowledgeBaseConfiguration")]
    knowledge_base: KnowledgeBaseConfiguration<'a>,
}

#[derive(Debug, Serialize)]
struct KnowledgeBaseConfiguration<'a> {
    #[serde(rename = "knowledgeBaseId")]
    knowledge_base_id: &'a str,
    #[serde(rename = "modelArn")]
    model_arn: &'a str,
}

/// Knowledge base reached over HTTP with an optional bearer token.
#[derive(Debug, Clone)]
pub struct HttpKnowledgeBase {
    config: KnowledgeBaseConfig,
    http: Client,
}

impl HttpKnowledgeBase {
    /// Build the client with the section's timeout.
    pub fn new(config: KnowledgeBaseConfig) -> DomainResult<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                DomainError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;
        Ok(Self { config, http })
    }

    /// Token from config, falling back to `INSIGHTFLOW_KB_TOKEN`.
    fn token(&self) -> Option<String> {
        self.config
            .api_token
            .clone()
            .or_else(|| std::env::var("INSIGHTFLOW_KB_TOKEN").ok())
            .filter(|t| !t.is_empty())
    }
}

#[async_trait]
impl KnowledgeBase for HttpKnowledgeBase {
    #[instrument(skip(self, question))]
    async fn retrieve_and_generate(
        &self,
        question: &str,
        knowledge_base_id: &str,
    ) -> DomainResult<RetrieveAndGenerateResponse> {
        let url = format!(
            "{}/retrieveAndGenerate",
            self.config.base_url.trim_end_matches('/')
        );
        let body = RetrieveAndGenerateRequest {
            input: TextInput { text: question },
            configuration: RetrieveAndGenerateConfiguration {
                config_type: "KNOWLEDGE_BASE",
                knowledge_base: KnowledgeBaseConfiguration {
                    knowledge_base_id,
                    model_arn: &self.config.model_arn,
                },
            },
        };

        let mut request = self
            .http
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body);
        if let Some(token) = self.token() {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await.map_err(|e| {
            DomainError::KnowledgeBase(format!("retrieveAndGenerate request failed: {e}"))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DomainError::KnowledgeBase(format!(
                "retrieveAndGenerate returned {status}: {body}"
            )));
        }

        let parsed = resp
            .json::<RetrieveAndGenerateResponse>()
            .await
            .map_err(|e| {
                DomainError::KnowledgeBase(format!("retrieveAndGenerate parse failed: {e}"))
            })?;
        debug!(citations = parsed.citations.len(), "retrieval finished");
        Ok(parsed)
    }
}
