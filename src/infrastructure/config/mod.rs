//! Configuration loading
//!
//! Hierarchical configuration using figment:
//! - programmatic defaults
//! - project YAML files under `.insightflow/`
//! - `INSIGHTFLOW_*` environment overrides

pub mod loader;

pub use loader::{ConfigError, ConfigLoader, CONFIG_DIR, CONFIG_FILE, LOCAL_CONFIG_FILE};
