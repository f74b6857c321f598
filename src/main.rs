//! Insightflow CLI entry point.

use clap::Parser;

use insightflow::cli::commands::{analyses, ask, chat, config, init};
use insightflow::cli::{app, handle_error, Cli, Commands};
use insightflow::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    // Logging follows the loaded config; fall back to defaults so config
    // errors themselves still get reported.
    let log_config = app::load_config(config_path)
        .map(|c| LogConfig::from(&c.logging))
        .unwrap_or_default();
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("Failed to initialize logging: {err:#}");
            None
        }
    };

    let result = match cli.command {
        Commands::Chat(args) => chat::execute(args, config_path, cli.json).await,
        Commands::Ask(args) => ask::execute(args, config_path, cli.json).await,
        Commands::Init(args) => init::execute(args, cli.json).await,
        Commands::Analyses(args) => analyses::execute(args, config_path, cli.json).await,
        Commands::Config(args) => config::execute(args, config_path, cli.json),
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
