//! HTTP client for the dashboard-hosting REST API.
//!
//! Analyses live under `/accounts/{account}/analyses/{id}`. A create call the
//! host rejects comes back as `CreateAnalysisOutcome::Error`; every other
//! non-success status is an `Err`.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AnalysisSummary, CreateAnalysisOutcome, DashboardConfig, DashboardDefinition,
};
use crate::domain::ports::DashboardHost;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateAnalysisRequest<'a> {
    name: &'a str,
    definition: &'a Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ResourcePermission<'a> {
    principal: &'a str,
    actions: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct UpdatePermissionsRequest<'a> {
    grant_permissions: Vec<ResourcePermission<'a>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListAnalysesResponse {
    #[serde(default)]
    analysis_summary_list: Vec<AnalysisSummary>,
}

/// Dashboard host reached over HTTP with an optional bearer token.
#[derive(Debug, Clone)]
pub struct HttpDashboardHost {
    config: DashboardConfig,
    http: Client,
}

impl HttpDashboardHost {
    /// Build the client with the section's timeout.
    pub fn new(config: DashboardConfig) -> DomainResult<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                DomainError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;
        Ok(Self { config, http })
    }

    fn analyses_url(&self) -> String {
        format!(
            "{}/accounts/{}/analyses",
            self.config.base_url.trim_end_matches('/'),
            self.config.account_id
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match self
            .config
            .api_token
            .clone()
            .or_else(|| std::env::var("INSIGHTFLOW_DASHBOARD_TOKEN").ok())
            .filter(|t| !t.is_empty())
        {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_json(&self, op: &str, builder: RequestBuilder) -> DomainResult<Value> {
        let resp = builder
            .send()
            .await
            .map_err(|e| DomainError::DashboardHost(format!("{op} request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DomainError::DashboardHost(format!(
                "{op} returned {status}: {body}"
            )));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| DomainError::DashboardHost(format!("{op} parse failed: {e}")))
    }
}

#[async_trait]
impl DashboardHost for HttpDashboardHost {
    #[instrument(skip(self, definition))]
    async fn create_analysis(
        &self,
        definition: &DashboardDefinition,
        name: &str,
        analysis_id: &str,
    ) -> DomainResult<CreateAnalysisOutcome> {
        let url = format!("{}/{}", self.analyses_url(), analysis_id);
        let body = CreateAnalysisRequest {
            name,
            definition: definition.body(),
        };

        let resp = self
            .request(Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::DashboardHost(format!("create_analysis request failed: {e}")))?;

        let status = resp.status();
        if status.is_client_error() {
            let body = resp.text().await.unwrap_or_default();
            return Ok(CreateAnalysisOutcome::Error {
                message: format!("API error {status}: {body}"),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DomainError::DashboardHost(format!(
                "create_analysis returned {status}: {body}"
            )));
        }

        let response = resp
            .json::<Value>()
            .await
            .map_err(|e| DomainError::DashboardHost(format!("create_analysis parse failed: {e}")))?;
        debug!(?response, "analysis created");
        Ok(CreateAnalysisOutcome::Success { response })
    }

    #[instrument(skip(self))]
    async fn list_analyses(&self) -> DomainResult<Vec<AnalysisSummary>> {
        let value = self
            .send_json("list_analyses", self.request(Method::GET, &self.analyses_url()))
            .await?;
        let listing: ListAnalysesResponse = serde_json::from_value(value).map_err(|e| {
            DomainError::DashboardHost(format!("list_analyses parse failed: {e}"))
        })?;
        Ok(listing.analysis_summary_list)
    }

    #[instrument(skip(self))]
    async fn grant_permissions(&self, analysis_id: &str) -> DomainResult<Value> {
        let url = format!("{}/{}/permissions", self.analyses_url(), analysis_id);
        let body = UpdatePermissionsRequest {
            grant_permissions: vec![ResourcePermission {
                principal: &self.config.principal_arn,
                actions: &self.config.permission_actions,
            }],
        };
        self.send_json("grant_permissions", self.request(Method::PUT, &url).json(&body))
            .await
    }

    #[instrument(skip(self))]
    async fn delete_analysis(&self, analysis_id: &str) -> DomainResult<Value> {
        let url = format!("{}/{}", self.analyses_url(), analysis_id);
        self.send_json("delete_analysis", self.request(Method::DELETE, &url))
            .await
    }
}
