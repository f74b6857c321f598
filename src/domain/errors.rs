//! Domain errors for the insightflow workflow core.

use thiserror::Error;

/// Domain-level errors that can occur while processing a turn.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Completion service call failed
    #[error("Completion service error: {0}")]
    Completion(String),

    /// Knowledge base call failed
    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    /// Dashboard host call failed
    #[error("Dashboard host error: {0}")]
    DashboardHost(String),

    /// Model reply did not have the expected structure
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    /// Planner output names an unknown value or misses a key
    #[error("Invalid visualization plan: {0}")]
    Plan(String),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Required state is absent, e.g. no definition to publish
    #[error("Missing precondition: {0}")]
    MissingPrecondition(String),

    /// Requested hosting action is not supported
    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    /// Adapter could not be built from its config
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Whether the error came from a call to an external service.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::Completion(_) | Self::KnowledgeBase(_) | Self::DashboardHost(_)
        )
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}
