//! `insightflow chat`: interactive conversation loop.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::app;
use crate::cli::commands::ask::ReplyOutput;
use crate::cli::output::progress::create_spinner;
use crate::cli::output::{output, CommandOutput};
use crate::services::SessionId;

/// First line printed by the REPL.
pub const GREETING: &str = "Hi! Ask me a question about your data, paste an SQL query, \
or ask me to chart an earlier answer. Type 'reset' to start over or 'exit' to quit.";

/// Arguments of `insightflow chat`.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Session id to use (random when omitted)
    #[arg(short, long)]
    pub session: Option<String>,
}

/// What a line of input asks the loop to do.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Exit,
    Reset,
    Empty,
    Turn(&'a str),
}

fn classify(line: &str) -> ChatInput<'_> {
    let trimmed = line.trim();
    match trimmed.to_lowercase().as_str() {
        "" => ChatInput::Empty,
        "exit" | "quit" => ChatInput::Exit,
        "reset" => ChatInput::Reset,
        _ => ChatInput::Turn(trimmed),
    }
}

/// Read turns from stdin until `exit` or end of input.
///
/// With `--json` each reply is printed as one JSON line and the prompt and
/// greeting are suppressed.
pub async fn execute(args: ChatArgs, config_path: Option<&Path>, json_mode: bool) -> Result<()> {
    let config = app::load_config(config_path)?;
    let coordinator = app::coordinator(&config)?;
    let session = args.session.map_or_else(SessionId::generate, SessionId::new);

    tracing::info!(%session, "chat session started");
    if !json_mode {
        println!("{}\n", style(GREETING).cyan());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if !json_mode {
            eprint!("{} ", style(">").green().bold());
        }
        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        match classify(&line) {
            ChatInput::Empty => {}
            ChatInput::Exit => break,
            ChatInput::Reset => {
                coordinator.reset(&session).await;
                if !json_mode {
                    println!("Session cleared.\n");
                }
            }
            ChatInput::Turn(text) => {
                let spinner = create_spinner("Thinking", json_mode);
                let reply = coordinator.handle_turn(&session, text).await;
                spinner.finish_and_clear();

                let reply = ReplyOutput::from(reply);
                if json_mode {
                    println!("{}", reply.to_json());
                } else {
                    output(&reply, false);
                    println!();
                }
            }
        }
    }
    Ok(())
}
