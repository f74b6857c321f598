//! Infrastructure adapters for external systems.

pub mod dashboard;
pub mod knowledge_base;
pub mod llm;
