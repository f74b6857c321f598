//! `insightflow config`: show the effective configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::Path;

use crate::cli::app;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

/// Arguments of `insightflow config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Config operation
    #[command(subcommand)]
    pub command: ConfigCommands,
}

/// Configuration operations.
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the merged configuration with secrets masked
    Show,
}

/// Effective configuration as printed.
#[derive(Debug, serde::Serialize)]
pub struct ConfigOutput {
    /// Merged configuration
    pub config: Config,
}

impl ConfigOutput {
    /// Replace API keys and tokens with a fixed mask.
    pub fn masked(mut config: Config) -> Self {
        let mask = |secret: &mut Option<String>| {
            if secret.is_some() {
                *secret = Some("********".to_string());
            }
        };
        mask(&mut config.llm.api_key);
        mask(&mut config.knowledge_base.api_token);
        mask(&mut config.dashboard.api_token);
        Self { config }
    }
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config).unwrap_or_default()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }
}

/// Run a `config` subcommand.
pub fn execute(args: ConfigArgs, config_path: Option<&Path>, json_mode: bool) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            let config = app::load_config(config_path)?;
            output(&ConfigOutput::masked(config), json_mode);
        }
    }
    Ok(())
}
