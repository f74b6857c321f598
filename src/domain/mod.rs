//! Domain layer for insightflow
//!
//! Pure workflow models and the port traits external services implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
