//! `insightflow analyses`: direct access to the dashboard host.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::Path;

use crate::cli::app;
use crate::cli::output::table::format_analyses;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::AnalysisSummary;

/// Arguments of `insightflow analyses`.
#[derive(Args, Debug)]
pub struct AnalysesArgs {
    /// Analysis operation
    #[command(subcommand)]
    pub command: AnalysesCommands,
}

/// Operations on hosted analyses.
#[derive(Subcommand, Debug)]
pub enum AnalysesCommands {
    /// List hosted analyses
    List,
    /// Delete an analysis by id
    Delete {
        /// Analysis id (the name without spaces)
        id: String,
    },
}

/// Listing of hosted analyses.
#[derive(Debug, serde::Serialize)]
pub struct AnalysisListOutput {
    /// Analyses reported by the host
    pub analyses: Vec<AnalysisSummary>,
    /// Number of analyses
    pub total: usize,
}

impl CommandOutput for AnalysisListOutput {
    fn to_human(&self) -> String {
        format_analyses(&self.analyses)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Outcome of a single analysis operation.
#[derive(Debug, serde::Serialize)]
pub struct AnalysisActionOutput {
    /// Whether the host accepted the request
    pub success: bool,
    /// Summary for humans
    pub message: String,
    /// Raw host response
    pub response: serde_json::Value,
}

impl CommandOutput for AnalysisActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Run an `analyses` subcommand against the configured host.
pub async fn execute(
    args: AnalysesArgs,
    config_path: Option<&Path>,
    json_mode: bool,
) -> Result<()> {
    let config = app::load_config(config_path)?;
    let host = app::dashboard_host(&config)?;

    match args.command {
        AnalysesCommands::List => {
            let analyses = host
                .list_analyses()
                .await
                .context("Failed to list analyses")?;
            let out = AnalysisListOutput {
                total: analyses.len(),
                analyses,
            };
            output(&out, json_mode);
        }
        AnalysesCommands::Delete { id } => {
            let response = host
                .delete_analysis(&id)
                .await
                .with_context(|| format!("Failed to delete analysis {id}"))?;
            let out = AnalysisActionOutput {
                success: true,
                message: format!("Analysis deleted: {id}"),
                response,
            };
            output(&out, json_mode);
        }
    }
    Ok(())
}
