//! Breaks SQL down into the literal column and table names it references.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CompletionRequest, SqlBreakdown};
use crate::domain::ports::CompletionProvider;
use crate::services::{extract_json_from_response, prompts};

/// SQL breakdown agent.
pub struct SqlBreakdownAnalyzer {
    provider: Arc<dyn CompletionProvider>,
}

impl SqlBreakdownAnalyzer {
    /// Create an analyzer over `provider`.
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Ask the model for the breakdown, then drop any alias it let through.
    #[instrument(skip(self, sql))]
    pub async fn analyze(&self, sql: &str) -> DomainResult<SqlBreakdown> {
        let response = self
            .provider
            .complete(CompletionRequest::new(
                prompts::sql_analyzer(),
                prompts::sql_analyzer_input(sql),
            ))
            .await?;

        let breakdown = parse_breakdown(&response)?.without_aliases(sql);
        debug!(
            columns = breakdown.column_names.len(),
            tables = breakdown.table_names.len(),
            "sql breakdown parsed"
        );
        Ok(breakdown)
    }
}

/// Parse the model's breakdown, accepting JSON or `"column_names": [...]` lines.
pub fn parse_breakdown(response: &str) -> DomainResult<SqlBreakdown> {
    let json = extract_json_from_response(response);
    if let Ok(breakdown) = serde_json::from_str::<SqlBreakdown>(&json) {
        return Ok(breakdown);
    }

    warn!("sql breakdown was not valid JSON, reading list lines");
    let mut breakdown = SqlBreakdown::default();
    for line in response.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().trim_start_matches(['-', '*', ' ']).trim_matches(['"', '\'']);
        let target = match key {
            "column_names" => &mut breakdown.column_names,
            "table_names" => &mut breakdown.table_names,
            _ => continue,
        };
        *target = parse_name_list(value);
    }

    if breakdown.is_empty() {
        return Err(DomainError::MalformedOutput(format!(
            "could not read column_names or table_names from: {response}"
        )));
    }
    Ok(breakdown)
}

fn parse_name_list(value: &str) -> Vec<String> {
    let value = value.trim().trim_end_matches(',');
    serde_json::from_str::<Vec<String>>(value).unwrap_or_else(|_| {
        value
            .trim_matches(['[', ']'])
            .split(',')
            .map(|s| s.trim().trim_matches(['"', '\'']).to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}
