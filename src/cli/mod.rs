//! Command-line interface.

pub mod app;
pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};

use console::style;

/// Print a top-level command error, as JSON when requested, and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "causes": causes,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", style("Error:").red().bold());
    }
    std::process::exit(1);
}
