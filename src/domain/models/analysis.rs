//! Analyses held by the dashboard-hosting service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Analysis id derived from a display name by removing every space.
///
/// `"Q3 Revenue Review"` becomes `"Q3RevenueReview"`.
pub fn analysis_id_from_name(name: &str) -> String {
    name.chars().filter(|c| *c != ' ').collect()
}

/// Result of a create call as reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CreateAnalysisOutcome {
    /// The host accepted the definition.
    Success {
        /// Host response body
        response: Value,
    },
    /// The host rejected the request (4xx).
    Error {
        /// Rejection message from the host
        message: String,
    },
}

impl CreateAnalysisOutcome {
    /// Whether the analysis now exists.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// One entry of the host's analysis listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalysisSummary {
    /// Id derived from the display name
    pub analysis_id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Resource name assigned by the host
    #[serde(default)]
    pub arn: Option<String>,
    /// Creation status, e.g. `CREATION_SUCCESSFUL`
    #[serde(default)]
    pub status: Option<String>,
    /// Creation timestamp as reported
    #[serde(default)]
    pub created_time: Option<String>,
    /// Last update timestamp as reported
    #[serde(default)]
    pub last_updated_time: Option<String>,
}
