//! In-memory dashboard host for tests and offline runs.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AnalysisSummary, CreateAnalysisOutcome, DashboardDefinition};
use crate::domain::ports::DashboardHost;

/// Analysis as stored by the in-memory host.
#[derive(Debug, Clone)]
pub struct StoredAnalysis {
    /// Display name
    pub name: String,
    /// Submitted definition
    pub definition: DashboardDefinition,
    /// Whether permissions were granted
    pub permissions_granted: bool,
}

/// Keeps analyses in a map; failures can be injected per operation.
#[derive(Clone, Default)]
pub struct InMemoryDashboardHost {
    analyses: Arc<RwLock<BTreeMap<String, StoredAnalysis>>>,
    create_failure: Arc<RwLock<Option<String>>>,
    create_calls: Arc<RwLock<u32>>,
}

impl InMemoryDashboardHost {
    /// Empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail create calls with a transport error until cleared.
    pub async fn fail_creates(&self, message: Option<String>) {
        *self.create_failure.write().await = message;
    }

    /// Number of create calls so far, failed ones included.
    pub async fn create_calls(&self) -> u32 {
        *self.create_calls.read().await
    }

    /// Stored analysis by id.
    pub async fn get(&self, analysis_id: &str) -> Option<StoredAnalysis> {
        self.analyses.read().await.get(analysis_id).cloned()
    }
}

#[async_trait]
impl DashboardHost for InMemoryDashboardHost {
    async fn create_analysis(
        &self,
        definition: &DashboardDefinition,
        name: &str,
        analysis_id: &str,
    ) -> DomainResult<CreateAnalysisOutcome> {
        *self.create_calls.write().await += 1;

        if let Some(message) = self.create_failure.read().await.clone() {
            return Err(DomainError::DashboardHost(message));
        }

        let mut analyses = self.analyses.write().await;
        if analyses.contains_key(analysis_id) {
            return Ok(CreateAnalysisOutcome::Error {
                message: format!("ResourceExistsException: analysis {analysis_id} already exists"),
            });
        }
        analyses.insert(
            analysis_id.to_string(),
            StoredAnalysis {
                name: name.to_string(),
                definition: definition.clone(),
                permissions_granted: false,
            },
        );
        Ok(CreateAnalysisOutcome::Success {
            response: json!({
                "AnalysisId": analysis_id,
                "CreationStatus": "CREATION_IN_PROGRESS",
                "Status": 202
            }),
        })
    }

    async fn list_analyses(&self) -> DomainResult<Vec<AnalysisSummary>> {
        Ok(self
            .analyses
            .read()
            .await
            .iter()
            .map(|(id, stored)| AnalysisSummary {
                analysis_id: id.clone(),
                name: stored.name.clone(),
                arn: None,
                status: Some("CREATION_SUCCESSFUL".to_string()),
                created_time: None,
                last_updated_time: None,
            })
            .collect())
    }

    async fn grant_permissions(&self, analysis_id: &str) -> DomainResult<Value> {
        let mut analyses = self.analyses.write().await;
        let stored = analyses.get_mut(analysis_id).ok_or_else(|| {
            DomainError::DashboardHost(format!("analysis {analysis_id} not found"))
        })?;
        stored.permissions_granted = true;
        Ok(json!({"AnalysisId": analysis_id, "Status": 200}))
    }

    async fn delete_analysis(&self, analysis_id: &str) -> DomainResult<Value> {
        self.analyses
            .write()
            .await
            .remove(analysis_id)
            .map(|_| json!({"AnalysisId": analysis_id, "Status": 200}))
            .ok_or_else(|| DomainError::DashboardHost(format!("analysis {analysis_id} not found")))
    }
}
