//! Table output for analysis listings using comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use crate::cli::output::truncate;
use crate::domain::models::AnalysisSummary;

/// Render analyses as a borderless table.
pub fn format_analyses(analyses: &[AnalysisSummary]) -> String {
    if analyses.is_empty() {
        return "No analyses found.".to_string();
    }
    let use_colors = supports_color();

    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            ["ID", "NAME", "STATUS", "UPDATED"]
                .into_iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
        );

    for analysis in analyses {
        let status = analysis.status.as_deref().unwrap_or("-");
        let status_cell = if use_colors {
            Cell::new(status).fg(status_color(status))
        } else {
            Cell::new(status)
        };
        table.add_row(vec![
            Cell::new(&analysis.analysis_id),
            Cell::new(truncate(&analysis.name, 40)),
            status_cell,
            Cell::new(analysis.last_updated_time.as_deref().unwrap_or("-")),
        ]);
    }

    let noun = if analyses.len() == 1 { "analysis" } else { "analyses" };
    format!("{} {noun}:\n{table}", analyses.len())
}

fn status_color(status: &str) -> Color {
    if status.ends_with("SUCCESSFUL") {
        Color::Green
    } else if status.ends_with("IN_PROGRESS") {
        Color::Yellow
    } else if status.ends_with("FAILED") {
        Color::Red
    } else {
        Color::White
    }
}

fn supports_color() -> bool {
    env::var_os("NO_COLOR").is_none() && console::colors_enabled()
}
