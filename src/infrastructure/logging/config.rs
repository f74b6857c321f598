//! Logging configuration resolved from the `logging` config section.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::models::config::LoggingConfig;

/// Resolved logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format for the stderr layer
    pub format: LogFormat,

    /// Directory for rolling log files (stderr only when None)
    pub log_dir: Option<PathBuf>,

    /// Log rotation policy
    pub rotation: RotationPolicy,
}

/// Output format of the stderr layer
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event
    Json,
    /// Compact human-readable lines
    #[default]
    Pretty,
}

/// How often rolling log files are rotated
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    /// New file every day
    #[default]
    Daily,
    /// New file every hour
    Hourly,
    /// Single file, never rotated
    Never,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

impl FromStr for RotationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "hourly" => Ok(Self::Hourly),
            "never" => Ok(Self::Never),
            other => Err(format!("unknown rotation policy: {other}")),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from(&LoggingConfig::default())
    }
}

impl From<&LoggingConfig> for LogConfig {
    /// Unknown format or rotation strings fall back to the defaults; the
    /// config loader rejects them before this point.
    fn from(config: &LoggingConfig) -> Self {
        Self {
            level: config.level.clone(),
            format: config.format.parse().unwrap_or_default(),
            log_dir: config.log_dir.as_ref().map(PathBuf::from),
            rotation: config.rotation.parse().unwrap_or_default(),
        }
    }
}
