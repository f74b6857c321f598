//! CLI command implementations.

pub mod analyses;
pub mod ask;
pub mod chat;
pub mod config;
pub mod init;
