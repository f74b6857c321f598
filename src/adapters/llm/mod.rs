//! Completion provider implementations.

pub mod anthropic_api;
pub mod mock;

pub use anthropic_api::AnthropicCompletionProvider;
pub use mock::{MockCompletionProvider, MockResponse};
