//! Knowledge base adapters.

pub mod http;
pub mod memory;

pub use http::HttpKnowledgeBase;
pub use memory::InMemoryKnowledgeBase;
