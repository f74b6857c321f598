//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces the adapters implement:
//! - CompletionProvider: hosted LLM completions
//! - KnowledgeBase: retrieve-and-generate over a relational knowledge base
//! - DashboardHost: analysis create/list/permissions/delete

pub mod completion;
pub mod dashboard_host;
pub mod knowledge_base;

pub use completion::CompletionProvider;
pub use dashboard_host::DashboardHost;
pub use knowledge_base::KnowledgeBase;
