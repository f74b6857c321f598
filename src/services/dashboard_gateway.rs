//! Dashboard-hosting gateway: classifies hosting requests and drives the
//! pending-action state machine.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    analysis_id_from_name, ActionState, AnalysisSummary, CompletionRequest, CreateAnalysisOutcome,
    DashboardDefinition, HostingAction, WorkflowState,
};
use crate::domain::ports::{CompletionProvider, DashboardHost};
use crate::services::{apology, extract_json_from_response, failure_reply, prompts};

/// Reply when a create is requested before any definition exists.
pub const NO_DEFINITION_ADVISORY: &str = "There is no JSON definition to create a QuickSight analysis from. Do you want to create a visualization plan first?";
/// Reply for update requests.
pub const UPDATE_UNSUPPORTED_ADVISORY: &str = "Updating an existing analysis is not supported yet. You can create a new analysis from the current definition instead, or say 'retry' once updates are available.";
/// Reply for `retry` with no failed or pending action.
pub const NOTHING_TO_RETRY_ADVISORY: &str = "There is no failed analysis action to retry.";
/// Reply when the request names no hosting action.
pub const NO_ACTION_ADVISORY: &str = "I can create an analysis from the current definition or list the existing analyses. What would you like to do?";

/// Classifier verdict for one hosting request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostingIntent {
    /// Requested action; `None` for "none" or anything unrecognized
    pub action: Option<HostingAction>,
    /// Analysis name given by the user, if any
    pub analysis_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawHostingIntent {
    action: Option<String>,
    #[serde(default)]
    analysis_name: Option<String>,
}

impl HostingIntent {
    /// Parse the classifier's JSON reply. `"none"` and unknown actions map to
    /// no action.
    pub fn parse(response: &str) -> DomainResult<Self> {
        let raw: RawHostingIntent = serde_json::from_str(&extract_json_from_response(response))
            .map_err(|e| {
                DomainError::MalformedOutput(format!("hosting intent was not JSON: {e}"))
            })?;
        let action = raw.action.as_deref().and_then(|a| a.parse().ok());
        let analysis_name = raw
            .analysis_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty() && !n.eq_ignore_ascii_case("null"));
        Ok(Self {
            action,
            analysis_name,
        })
    }
}

/// Hosting gateway for dashboard definitions.
///
/// Classifies free-text hosting requests and runs them against the
/// [`DashboardHost`]. The outcome is tracked in [`WorkflowState::action`]:
/// a failed create stays retryable, a create without a definition stays
/// pending until one exists.
pub struct DashboardGateway {
    provider: Arc<dyn CompletionProvider>,
    host: Arc<dyn DashboardHost>,
    default_analysis_name: String,
}

impl DashboardGateway {
    /// `default_analysis_name` is used when a create names no analysis.
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        host: Arc<dyn DashboardHost>,
        default_analysis_name: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            host,
            default_analysis_name: default_analysis_name.into(),
        }
    }

    /// Classify `text` and run the resulting action.
    ///
    /// | Classified as | State before      | Result                              |
    /// |---------------|-------------------|-------------------------------------|
    /// | create/list   | any               | `Pending`, then run                 |
    /// | update        | any               | advisory, `Failed`                  |
    /// | retry         | `Failed`/`Pending`| action re-run                       |
    /// | retry         | `Idle`            | [`NOTHING_TO_RETRY_ADVISORY`]       |
    /// | none          | `Pending`         | pending action re-run               |
    /// | none          | otherwise         | [`NO_ACTION_ADVISORY`]              |
    ///
    /// A create without a stored definition answers
    /// [`NO_DEFINITION_ADVISORY`] and stays `Pending`. Success returns to
    /// `Idle`; host failures move to `Failed` with a retry hint. The reply is
    /// always user-facing text.
    #[instrument(skip(self, state, text))]
    pub async fn handle(&self, state: &mut WorkflowState, text: &str) -> String {
        let intent = match self.classify(text).await {
            Ok(intent) => intent,
            Err(e) => return failure_reply("understanding the analysis request", &e),
        };

        match intent.action {
            Some(HostingAction::Retry) => self.retry(state).await,
            Some(action) => {
                state.begin_hosting_action(action, intent.analysis_name);
                self.run_pending(state).await
            }
            // A bare confirmation continues whatever is still pending.
            None => match state.action {
                ActionState::Pending { .. } => self.run_pending(state).await,
                _ => NO_ACTION_ADVISORY.to_string(),
            },
        }
    }

    async fn classify(&self, text: &str) -> DomainResult<HostingIntent> {
        let response = self
            .provider
            .complete(CompletionRequest::new(prompts::hosting_intent(), text).with_max_tokens(128))
            .await?;
        let intent = HostingIntent::parse(&response)?;
        info!(action = ?intent.action, name = ?intent.analysis_name, "hosting intent classified");
        Ok(intent)
    }

    async fn retry(&self, state: &mut WorkflowState) -> String {
        match state.action.clone() {
            ActionState::Failed { action, name, .. } => {
                info!(%action, "retrying failed hosting action");
                state.begin_hosting_action(action, name);
                self.run_pending(state).await
            }
            ActionState::Pending { .. } => self.run_pending(state).await,
            ActionState::Idle => NOTHING_TO_RETRY_ADVISORY.to_string(),
        }
    }

    /// Execute the pending action, moving to `Idle` on success and `Failed`
    /// on an external error.
    async fn run_pending(&self, state: &mut WorkflowState) -> String {
        let ActionState::Pending { action, name } = state.action.clone() else {
            return NO_ACTION_ADVISORY.to_string();
        };

        match action {
            HostingAction::Create => self.create(state, name).await,
            HostingAction::List => match self.host.list_analyses().await {
                Ok(analyses) => {
                    state.complete_hosting_action();
                    format_listing(&analyses)
                }
                Err(e) => fail(state, action, name, "listing analyses", &e),
            },
            HostingAction::Update => {
                warn!(name = ?name, "analysis update requested but not supported");
                state.fail_hosting_action(
                    action,
                    name,
                    "updating an existing analysis is not supported",
                );
                UPDATE_UNSUPPORTED_ADVISORY.to_string()
            }
            // Never stored as pending; `handle` re-dispatches the failed action.
            HostingAction::Retry => {
                state.complete_hosting_action();
                NOTHING_TO_RETRY_ADVISORY.to_string()
            }
        }
    }

    async fn create(&self, state: &mut WorkflowState, name: Option<String>) -> String {
        let definition = match stored_definition(state) {
            Ok(definition) => definition,
            Err(e) => {
                info!(reason = %e, "create deferred");
                return NO_DEFINITION_ADVISORY.to_string();
            }
        };

        let analysis_name = name
            .clone()
            .unwrap_or_else(|| self.default_analysis_name.clone());
        let analysis_id = analysis_id_from_name(&analysis_name);

        match self
            .host
            .create_analysis(&definition, &analysis_name, &analysis_id)
            .await
        {
            Ok(CreateAnalysisOutcome::Success { .. }) => {
                state.complete_hosting_action();
                info!(%analysis_id, "analysis created");

                match self.host.grant_permissions(&analysis_id).await {
                    Ok(_) => format!(
                        "Created analysis '{analysis_name}' (id {analysis_id}) and granted access."
                    ),
                    Err(e) => {
                        warn!(error = %e, %analysis_id, "granting analysis permissions failed");
                        format!(
                            "Created analysis '{analysis_name}' (id {analysis_id}), but granting access failed: {e}"
                        )
                    }
                }
            }
            Ok(CreateAnalysisOutcome::Error { message }) => fail(
                state,
                HostingAction::Create,
                name,
                "creating the analysis",
                &message,
            ),
            Err(e) => fail(state, HostingAction::Create, name, "creating the analysis", &e),
        }
    }
}

fn stored_definition(state: &WorkflowState) -> DomainResult<DashboardDefinition> {
    state.dashboard_definition.clone().ok_or_else(|| {
        DomainError::MissingPrecondition("no dashboard definition in the session".to_string())
    })
}

fn fail(
    state: &mut WorkflowState,
    action: HostingAction,
    name: Option<String>,
    activity: &str,
    cause: &dyn std::fmt::Display,
) -> String {
    error!(%action, error = %cause, "hosting action failed");
    state.fail_hosting_action(action, name, cause.to_string());
    format!("{} Say 'retry' to try again.", apology(activity, cause))
}

fn format_listing(analyses: &[AnalysisSummary]) -> String {
    if analyses.is_empty() {
        return "No analyses found.".to_string();
    }
    let lines = analyses
        .iter()
        .map(|a| match &a.status {
            Some(status) => format!("- {} ({}) {}", a.name, a.analysis_id, status),
            None => format!("- {} ({})", a.name, a.analysis_id),
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("Available analyses:\n{lines}")
}
