//! `insightflow init`: write a default project configuration.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::cli::output::{output, CommandOutput};
use crate::infrastructure::config::{ConfigLoader, CONFIG_DIR};

/// Arguments of `insightflow init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

/// Result of `init`.
#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    /// Whether the file was written
    pub success: bool,
    /// Summary for humans
    pub message: String,
    /// Path of the config file
    pub config_path: PathBuf,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        if self.success {
            format!(
                "{}\n\nEdit {} to point at your knowledge base and dashboard account.",
                self.message,
                self.config_path.display()
            )
        } else {
            self.message.clone()
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Write the default config under `target`, refusing to overwrite unless `force`.
pub async fn initialize(target: &Path, force: bool) -> Result<InitOutput> {
    let config_dir = target.join(CONFIG_DIR);
    let config_path = config_dir.join("config.yaml");

    if config_path.exists() && !force {
        return Ok(InitOutput {
            success: false,
            message: "Project already initialized. Use --force to overwrite the configuration."
                .to_string(),
            config_path,
        });
    }

    fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;
    fs::write(&config_path, ConfigLoader::default_yaml()?)
        .await
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    Ok(InitOutput {
        success: true,
        message: format!("Initialized insightflow in {}", target.display()),
        config_path,
    })
}

/// Write the default configuration under `args.path`.
pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let out = initialize(&target, args.force).await?;
    output(&out, json_mode);
    Ok(())
}
