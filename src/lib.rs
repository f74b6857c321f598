//! Insightflow - multi-agent data insight and dashboard orchestration
//!
//! Routes each conversational turn to one of three workflows:
//! knowledge-base retrieval of answers and SQL, planning and generating a
//! dashboard definition from that context, or publishing the definition to
//! a dashboard-hosting service.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and the ports external services implement
//! - **Adapters** (`adapters`): HTTP and in-memory implementations of the ports
//! - **Service Layer** (`services`): the agents and the coordinator
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{Config, DashboardDefinition, TurnReply, WorkflowState};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{Coordinator, SessionId, SessionRegistry};
