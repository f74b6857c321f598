//! Session-scoped workflow state shared by the agents of one conversation.
//!
//! The insight path appends retrieval context, the visualization chain stores
//! the latest plan and definition, and the hosting gateway drives its action
//! state machine. Turns for one session are serialized by the registry, so
//! nothing here needs interior locking.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::dashboard::DashboardDefinition;
use super::visualization::VisualizationPlan;
use crate::domain::errors::DomainError;

/// Retrieval output recorded for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightResponse {
    /// Absent for direct SQL questions
    pub query_plan: Option<String>,

    /// Absent when the knowledge base cited no SQL
    pub sql: Option<String>,

    /// Generated answer text
    pub answer: String,
}

/// One recorded question with its retrieval response. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightContextEntry {
    /// Question as asked
    pub question: String,
    /// What retrieval returned
    pub response: InsightResponse,
    /// When the entry was appended
    pub recorded_at: DateTime<Utc>,
}

impl InsightContextEntry {
    /// Entry stamped with the current time.
    pub fn new(question: impl Into<String>, response: InsightResponse) -> Self {
        Self {
            question: question.into(),
            response,
            recorded_at: Utc::now(),
        }
    }

    /// Answer without cited SQL.
    pub fn is_partial(&self) -> bool {
        self.response.sql.is_none()
    }
}

/// Hosting operations the gateway can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostingAction {
    /// Publish the stored definition as a new analysis
    Create,
    /// Update an existing analysis; rejected with an advisory
    Update,
    /// List hosted analyses
    List,
    /// Re-run the last failed action
    Retry,
}

impl HostingAction {
    /// Lowercase name used by the intent classifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::List => "list",
            Self::Retry => "retry",
        }
    }
}

impl fmt::Display for HostingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostingAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "list" => Ok(Self::List),
            "retry" => Ok(Self::Retry),
            other => Err(DomainError::UnsupportedAction(format!(
                "unknown hosting action '{other}'"
            ))),
        }
    }
}

/// Pending-action state machine of the hosting gateway.
///
/// `Idle -> Pending` when an action is classified, `Pending -> Idle` on
/// confirmed success and `Pending -> Failed` on an external error. `Failed`
/// keeps the action so it can be retried.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ActionState {
    /// Nothing in flight
    #[default]
    Idle,
    /// Classified but not yet completed
    Pending {
        /// Requested action
        action: HostingAction,
        /// Analysis name given by the user
        name: Option<String>,
    },
    /// Last attempt failed; `retry` runs it again
    Failed {
        /// Action that failed
        action: HostingAction,
        /// Analysis name of the attempt
        name: Option<String>,
        /// Failure shown in logs and state dumps
        reason: String,
    },
}

impl ActionState {
    /// Whether no action is in flight.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Action held by a pending or failed state.
    pub fn action(&self) -> Option<HostingAction> {
        match self {
            Self::Idle => None,
            Self::Pending { action, .. } | Self::Failed { action, .. } => Some(*action),
        }
    }

    /// Analysis name held by a pending or failed state.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Pending { name, .. } | Self::Failed { name, .. } => name.as_deref(),
        }
    }
}

/// Author of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The person chatting
    User,
    /// Reply from the coordinator
    Assistant,
}

/// One line of the session transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who spoke
    pub speaker: Speaker,
    /// What was said; definitions are summarized
    pub text: String,
    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Turn spoken by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Turn spoken by the assistant.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Everything the agents of one session share.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Retrieval history, oldest first
    pub insight_context: Vec<InsightContextEntry>,

    /// Raw planner text, stored verbatim
    pub visualization_plan: Option<String>,

    /// Typed parse of `visualization_plan`
    pub parsed_plan: Option<VisualizationPlan>,

    /// Latest post-processed definition
    pub dashboard_definition: Option<DashboardDefinition>,

    /// Hosting state machine
    pub action: ActionState,

    /// Analysis name of the action in flight; cleared when it ends
    pub target_analysis_name: Option<String>,

    /// Whether the latest insight question was already SQL
    pub has_direct_sql_query: bool,

    /// Conversation so far, used for turn routing
    pub transcript: Vec<ConversationTurn>,
}

impl WorkflowState {
    /// Empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent retrieval context, if any.
    pub fn latest_insight(&self) -> Option<&InsightContextEntry> {
        self.insight_context.last()
    }

    /// SQL of the most recent entry, when that entry carries any.
    pub fn latest_sql(&self) -> Option<&str> {
        self.latest_insight()
            .and_then(|entry| entry.response.sql.as_deref())
    }

    /// Append a retrieval to the context.
    pub fn record_insight(&mut self, entry: InsightContextEntry) {
        self.insight_context.push(entry);
    }

    /// Keep the raw planner reply and its parse, if any.
    pub fn store_plan(&mut self, raw: String, parsed: Option<VisualizationPlan>) {
        self.visualization_plan = Some(raw);
        self.parsed_plan = parsed;
    }

    /// Replace the stored definition.
    pub fn store_definition(&mut self, definition: DashboardDefinition) {
        self.dashboard_definition = Some(definition);
    }

    /// Move `action` to `Pending` and remember the requested analysis name.
    pub fn begin_hosting_action(&mut self, action: HostingAction, name: Option<String>) {
        self.target_analysis_name.clone_from(&name);
        self.action = ActionState::Pending { action, name };
    }

    /// Back to `Idle` with the hosting flags cleared.
    pub fn complete_hosting_action(&mut self) {
        self.action = ActionState::Idle;
        self.target_analysis_name = None;
    }

    /// Park the action as `Failed` for a later retry. The name travels with
    /// the failed state, so the target flag is cleared.
    pub fn fail_hosting_action(
        &mut self,
        action: HostingAction,
        name: Option<String>,
        reason: impl Into<String>,
    ) {
        self.action = ActionState::Failed {
            action,
            name,
            reason: reason.into(),
        };
        self.target_analysis_name = None;
    }

    /// Append to the transcript.
    pub fn push_turn(&mut self, turn: ConversationTurn) {
        self.transcript.push(turn);
    }

    /// The last `limit` transcript turns rendered as `speaker: text` lines.
    pub fn recent_transcript(&self, limit: usize) -> String {
        let start = self.transcript.len().saturating_sub(limit);
        self.transcript[start..]
            .iter()
            .map(|turn| {
                let who = match turn.speaker {
                    Speaker::User => "user",
                    Speaker::Assistant => "assistant",
                };
                format!("{who}: {}", turn.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Forget everything, including the transcript.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
