//! Figment-based configuration loader and validation.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project directory holding insightflow configuration
pub const CONFIG_DIR: &str = ".insightflow";
/// Shared project configuration
pub const CONFIG_FILE: &str = ".insightflow/config.yaml";
/// Machine-local overrides, usually git-ignored
pub const LOCAL_CONFIG_FILE: &str = ".insightflow/local.yaml";
/// Environment prefix; nested keys use `__`, e.g. `INSIGHTFLOW_LLM__MODEL`
pub const ENV_PREFIX: &str = "INSIGHTFLOW_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Log level outside the tracing levels
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Unknown log format
    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    /// Unknown rotation policy
    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    /// Base URL that is not http or https
    #[error("Invalid {section}.base_url: {url}. Must be an http(s) URL")]
    InvalidBaseUrl {
        /// Config section owning the URL
        section: &'static str,
        /// Rejected value
        url: String,
    },

    /// Zero timeout for the named section
    #[error("Invalid {0}.timeout_secs: must be at least 1")]
    InvalidTimeout(&'static str),

    /// Zero completion token budget
    #[error("Invalid llm.max_tokens: must be at least 1")]
    InvalidMaxTokens,

    /// Empty `knowledge_domains` list
    #[error("At least one knowledge domain must be configured")]
    NoKnowledgeDomains,

    /// Two knowledge domains share a name
    #[error("Duplicate knowledge domain name: {0}")]
    DuplicateDomain(String),

    /// Required field left blank
    #[error("{0} cannot be empty")]
    EmptyField(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .insightflow/config.yaml (created by init)
    /// 3. .insightflow/local.yaml (optional local overrides)
    /// 4. Environment variables (INSIGHTFLOW_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(CONFIG_FILE))
            .merge(Yaml::file(LOCAL_CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Default configuration rendered as YAML, as written by `init`
    pub fn default_yaml() -> Result<String> {
        serde_yaml::to_string(&Config::default()).context("Failed to render default config")
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        for (section, url) in [
            ("llm", &config.llm.base_url),
            ("knowledge_base", &config.knowledge_base.base_url),
            ("dashboard", &config.dashboard.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidBaseUrl {
                    section,
                    url: url.clone(),
                });
            }
        }

        for (section, timeout) in [
            ("llm", config.llm.timeout_secs),
            ("knowledge_base", config.knowledge_base.timeout_secs),
            ("dashboard", config.dashboard.timeout_secs),
        ] {
            if timeout == 0 {
                return Err(ConfigError::InvalidTimeout(section));
            }
        }

        if config.llm.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens);
        }

        if config.knowledge_domains.is_empty() {
            return Err(ConfigError::NoKnowledgeDomains);
        }
        let mut seen = HashSet::new();
        for domain in &config.knowledge_domains {
            if domain.name.trim().is_empty() {
                return Err(ConfigError::EmptyField("knowledge_domains[].name".to_string()));
            }
            if domain.knowledge_base_id.trim().is_empty() {
                return Err(ConfigError::EmptyField(format!(
                    "knowledge_domains[{}].knowledge_base_id",
                    domain.name
                )));
            }
            if !seen.insert(domain.name.to_lowercase()) {
                return Err(ConfigError::DuplicateDomain(domain.name.clone()));
            }
        }

        for (field, value) in [
            ("dashboard.account_id", &config.dashboard.account_id),
            (
                "dashboard.default_analysis_name",
                &config.dashboard.default_analysis_name,
            ),
            ("dataset.arn", &config.dataset.arn),
            ("dataset.identifier", &config.dataset.identifier),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyField(field.to_string()));
            }
        }

        Ok(())
    }
}
