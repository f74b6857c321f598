//! CLI type definitions
//!
//! Clap command structures for the `insightflow` binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::{
    analyses::AnalysesArgs, ask::AskArgs, chat::ChatArgs, config::ConfigArgs, init::InitArgs,
};

/// Top-level command line.
#[derive(Parser, Debug)]
#[command(name = "insightflow")]
#[command(about = "Insightflow - data insights and dashboard definitions from plain questions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Config file to load instead of .insightflow/config.yaml
    #[arg(short, long, global = true, env = "INSIGHTFLOW_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive conversation
    Chat(ChatArgs),

    /// Run a single turn and print the reply
    Ask(AskArgs),

    /// Write a default configuration to .insightflow/
    Init(InitArgs),

    /// Manage hosted analyses
    Analyses(AnalysesArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::analyses::AnalysesCommands;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "insightflow",
            "ask",
            "Revenue by category?",
            "--json",
            "--config",
            "custom.yaml",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
        match cli.command {
            Commands::Ask(args) => assert_eq!(args.text, "Revenue by category?"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_analyses_delete() {
        let cli = Cli::try_parse_from(["insightflow", "analyses", "delete", "Q3RevenueReview"])
            .unwrap();
        match cli.command {
            Commands::Analyses(args) => assert!(matches!(
                args.command,
                AnalysesCommands::Delete { ref id } if id == "Q3RevenueReview"
            )),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_chat_session() {
        let cli = Cli::try_parse_from(["insightflow", "chat", "--session", "demo"]).unwrap();
        match cli.command {
            Commands::Chat(args) => assert_eq!(args.session.as_deref(), Some("demo")),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
