//! `insightflow ask`: one turn, then exit.

use anyhow::Result;
use clap::Args;
use std::path::Path;

use crate::cli::app;
use crate::cli::output::progress::create_spinner;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::TurnReply;
use crate::services::SessionId;

/// Arguments of `insightflow ask`.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// Question, SQL query or request
    pub text: String,
}

/// Printable form of a turn reply.
#[derive(Debug, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplyOutput {
    /// Conversational reply
    Text {
        /// Reply text
        text: String,
    },
    /// Dashboard definition or other JSON document
    Definition {
        /// The document as sent to the user
        definition: serde_json::Value,
    },
}

impl From<TurnReply> for ReplyOutput {
    fn from(reply: TurnReply) -> Self {
        // Text that is itself a document renders as one.
        let reply = match reply {
            TurnReply::Text(text) => TurnReply::sniff(&text),
            definition @ TurnReply::Definition(_) => definition,
        };
        match reply {
            TurnReply::Text(text) => Self::Text { text },
            TurnReply::Definition(definition) => Self::Definition {
                definition: definition.into_value(),
            },
        }
    }
}

impl CommandOutput for ReplyOutput {
    fn to_human(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Definition { definition } => {
                serde_json::to_string_pretty(definition).unwrap_or_default()
            }
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Run one turn in a fresh session and print the reply.
pub async fn execute(args: AskArgs, config_path: Option<&Path>, json_mode: bool) -> Result<()> {
    let config = app::load_config(config_path)?;
    let coordinator = app::coordinator(&config)?;

    let spinner = create_spinner("Thinking", json_mode);
    let reply = coordinator
        .handle_turn(&SessionId::generate(), &args.text)
        .await;
    spinner.finish_and_clear();

    output(&ReplyOutput::from(reply), json_mode);
    Ok(())
}
