//! Domain models shared by services and adapters.

pub mod analysis;
pub mod completion;
pub mod config;
pub mod dashboard;
pub mod retrieval;
pub mod sql_breakdown;
pub mod visualization;
pub mod workflow_state;

pub use analysis::{analysis_id_from_name, AnalysisSummary, CreateAnalysisOutcome};
pub use completion::CompletionRequest;
pub use config::{
    Config, DashboardConfig, DatasetConfig, DefinitionConfig, GenerationMode, KnowledgeBaseConfig,
    KnowledgeDomainConfig, LlmConfig, LoggingConfig,
};
pub use dashboard::{DashboardDefinition, TurnReply, DATASET_PLACEHOLDER};
pub use retrieval::{RetrievalResult, RetrieveAndGenerateResponse};
pub use sql_breakdown::SqlBreakdown;
pub use visualization::{
    AggregationFunction, CalculatedField, FieldWellsType, SortDirection, SortType, VisualType,
    VisualizationPlan,
};
pub use workflow_state::{
    ActionState, ConversationTurn, HostingAction, InsightContextEntry, InsightResponse, Speaker,
    WorkflowState,
};
