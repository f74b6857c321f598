//! Dashboard-host port - create, list and share analyses.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AnalysisSummary, CreateAnalysisOutcome, DashboardDefinition};

/// Dashboard-hosting service holding analyses built from definitions.
#[async_trait]
pub trait DashboardHost: Send + Sync {
    /// Submit a definition as a new analysis.
    ///
    /// A host-side rejection is reported as `CreateAnalysisOutcome::Error`;
    /// transport failures are `Err`.
    async fn create_analysis(
        &self,
        definition: &DashboardDefinition,
        name: &str,
        analysis_id: &str,
    ) -> DomainResult<CreateAnalysisOutcome>;

    /// Every analysis in the configured account.
    async fn list_analyses(&self) -> DomainResult<Vec<AnalysisSummary>>;

    /// Grant the configured principal access to an analysis.
    async fn grant_permissions(&self, analysis_id: &str) -> DomainResult<Value>;

    /// Delete an analysis by id.
    async fn delete_analysis(&self, analysis_id: &str) -> DomainResult<Value>;
}
