//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber, written to
//! stderr with optional rolling JSON files.

pub mod config;
pub mod logger;

pub use config::{LogConfig, LogFormat, RotationPolicy};
pub use logger::LoggerImpl;
