//! Workflow services: the agents of the insight and dashboard pipeline, the
//! session registry and the coordinator that routes turns between them.

pub mod coordinator;
pub mod dashboard_gateway;
pub mod definition_generator;
pub mod insight_responder;
pub mod knowledge_retrieval;
pub mod prompts;
pub mod query_planner;
pub mod session_registry;
pub mod sql_analyzer;
pub mod visualization_planner;

pub use coordinator::{Coordinator, TurnIntent};
pub use dashboard_gateway::DashboardGateway;
pub use definition_generator::DefinitionGenerator;
pub use insight_responder::{InsightOutcome, InsightResponder};
pub use knowledge_retrieval::KnowledgeRetrievalClient;
pub use query_planner::QueryPlanner;
pub use session_registry::{SessionId, SessionRegistry};
pub use sql_analyzer::SqlBreakdownAnalyzer;
pub use visualization_planner::{PlannedVisualization, VisualizationPlanner};

use tracing::{error, warn};

use crate::domain::errors::DomainError;

/// Remove a surrounding markdown code fence (```json ... ``` or ``` ... ```).
///
/// Text without a leading fence is returned trimmed.
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    match body.rfind("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Extract a JSON object from a model response.
///
/// Strips code fences, then falls back to the outermost `{ ... }` span when
/// the model wrapped the object in prose.
pub fn extract_json_from_response(response: &str) -> String {
    let stripped = strip_code_fences(response);
    if stripped.starts_with('{') || stripped.starts_with('[') {
        return stripped.to_string();
    }
    match (stripped.find('{'), stripped.rfind('}')) {
        (Some(start), Some(end)) if start < end => stripped[start..=end].to_string(),
        _ => stripped.to_string(),
    }
}

/// Log a failed step and build its apology. Failed calls to external
/// services are logged at `warn`, malformed output and internal faults at
/// `error`.
pub fn failure_reply(activity: &str, err: &DomainError) -> String {
    if err.is_external() {
        warn!(error = %err, activity, "external call failed");
    } else {
        error!(error = %err, activity, "step failed");
    }
    apology(activity, err)
}

/// User-facing apology for a failed step, e.g. `apology("retrieving data", err)`.
pub fn apology(activity: &str, cause: impl std::fmt::Display) -> String {
    format!("Sorry, I encountered an error while {activity}: {cause}.")
}
