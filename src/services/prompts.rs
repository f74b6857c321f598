//! System prompts for every agent role.
//!
//! Each prompt opens with a distinct role line; the catalogs in the planner
//! and generator prompts are rendered from the typed enums so the prompt and
//! the parser never disagree.

use crate::domain::models::{
    AggregationFunction, FieldWellsType, KnowledgeDomainConfig, VisualType, DATASET_PLACEHOLDER,
};

/// Role line of the query planner prompt.
pub const QUERY_PLANNER_ROLE: &str = "You are a database query planner.";
/// Role line of the knowledge domain selector prompt.
pub const DOMAIN_SELECTOR_ROLE: &str = "You are a knowledge domain router.";
/// Role line of the SQL breakdown prompt.
pub const SQL_ANALYZER_ROLE: &str = "You are an SQL query analyzer.";
/// Role line of the visualization planner prompt.
pub const VISUAL_PLANNER_ROLE: &str = "You are a visual planning expert for dashboards.";
/// Role line of the definition generator prompt.
pub const DEFINITION_GENERATOR_ROLE: &str = "You are a dashboard definition generator.";
/// Role line of the hosting intent classifier prompt.
pub const HOSTING_INTENT_ROLE: &str = "You classify dashboard hosting requests.";
/// Role line of the turn router prompt.
pub const TURN_ROUTER_ROLE: &str = "You are the coordinator of a data assistant.";

/// Query planner prompt scoped to one domain `schema`.
pub fn query_planner(schema: &str) -> String {
    format!(
        "{QUERY_PLANNER_ROLE} Analyze the user's question and create a query plan.

DATABASE SCHEMA:
{schema}

Your task:
1. Identify the tables and columns needed to answer the question and the joins between them.
2. Summarize the plan as one short paragraph and output ONLY that summary.
3. Do NOT write SQL."
    )
}

/// User message for the query planner.
pub fn query_planner_input(question: &str) -> String {
    format!("Create a query plan for this question: {question}")
}

/// Prompt listing the configured domains by name and description.
pub fn domain_selector(domains: &[KnowledgeDomainConfig]) -> String {
    let listing = domains
        .iter()
        .map(|d| format!("- {}: {}", d.name, d.description))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{DOMAIN_SELECTOR_ROLE} Pick the one knowledge domain that can answer the user's question.

DOMAINS:
{listing}

Reply with ONLY the domain name. Never pick more than one."
    )
}

/// Prompt asking for literal column and table names as JSON.
pub fn sql_analyzer() -> String {
    format!(
        "{SQL_ANALYZER_ROLE} Break the SQL query in the input down into the identifiers it uses.

Your task:
1. List the actual column names read from tables.
2. List the actual table names.
3. Names introduced with the AS keyword are aliases. Never list an alias as a column.

OUTPUT FORMAT (JSON only, no commentary):
{{\"column_names\": [\"...\"], \"table_names\": [\"...\"]}}"
    )
}

/// User message for the SQL analyzer.
pub fn sql_analyzer_input(sql: &str) -> String {
    format!("Analyze this SQL query: {sql}")
}

/// Visualization planner prompt.
///
/// Lists every visual type, field-wells type and aggregation function the
/// plan parser accepts, and the exact key layout of the reply.
pub fn visual_planner() -> String {
    let visuals = VisualType::ALL
        .iter()
        .map(|v| format!("   - {v}"))
        .collect::<Vec<_>>()
        .join("\n");
    let wells = VisualType::ALL
        .iter()
        .filter_map(|v| v.field_wells().map(|w| format!("   - {w}: for {v}")))
        .collect::<Vec<_>>()
        .join("\n");
    let aggregations = AggregationFunction::ALL
        .iter()
        .map(|a| a.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let field_wells_count = FieldWellsType::ALL.len();

    format!(
        "{VISUAL_PLANNER_ROLE} From the SQL breakdown, the retrieval context and the user's request, plan the single most appropriate visual.

DECISION PROCEDURE:
1. VISUAL_TYPE - choose exactly one:
{visuals}
2. FIELD_WELLS_TYPE - the matching field wells ({field_wells_count} mappings):
{wells}
3. DIMENSION_FIELDS and MEASURE_FIELDS - literal column names from the SQL breakdown.
   Never use an alias: for \"SUM(si.item_total) AS total_revenue\" use \"item_total\", not \"total_revenue\".
4. AGGREGATION_FUNCTION_REQUIRED (True or False). If True, AGGREGATION_FUNCTIONS names one of: {aggregations}
5. CALCULATED_FIELDS_REQUIRED (True or False). Only when a plain aggregation cannot express the measure.
   If True, CALCULATED_FIELDS is a JSON object of name to expression.
6. SORT_TYPE (FieldSort or ColumnSort) and SORT_DIRECTION (ASC or DESC).
7. FILTER_TYPES (optional): CategoryFilter, NumericRangeFilter, NumericEqualityFilter, TimeEqualityFilter, TimeRangeFilter, RelativeDatesFilter, TopBottomFilter, NestedFilter.

OUTPUT FORMAT - one KEY: value per line, then SUMMARY:
VISUAL_TYPE: BarChartVisual
FIELD_WELLS_TYPE: BarChartAggregatedFieldWells
DIMENSION_FIELDS: [\"category\"]
MEASURE_FIELDS: [\"item_total\"]
AGGREGATION_FUNCTION_REQUIRED: True
AGGREGATION_FUNCTIONS: \"AggregationFunction\": {{\"SimpleNumericalAggregation\": \"SUM\"}}
SORT_TYPE: FieldSort
SORT_DIRECTION: DESC
CALCULATED_FIELDS_REQUIRED: False

SUMMARY: A bar chart of summed item_total per category answers total revenue by category."
    )
}

/// The fixed template the generator fills; `<...>` are placeholders.
pub fn definition_template() -> String {
    format!(
        r#"{{
  "Definition": {{
    "Sheets": [{{
      "SheetId": "sheet1",
      "Name": "<PROVIDE_MEANINGFUL_SHEET_NAME>",
      "Visuals": [{{
        "<VISUAL_TYPE>": {{
          "VisualId": "visual1",
          "Title": {{"FormatText": {{"PlainText": "<PROVIDE_MEANINGFUL_TITLE>"}}}},
          "Subtitle": {{"FormatText": {{"PlainText": "<PROVIDE_MEANINGFUL_SUBTITLE>"}}}},
          "ChartConfiguration": {{
            "FieldWells": {{
              "<FIELD_WELLS_TYPE>": {{
                "Category": [{{
                  "CategoricalDimensionField": {{
                    "FieldId": "<DIMENSION_FIELD_ID>",
                    "Column": {{"DataSetIdentifier": "{DATASET_PLACEHOLDER}", "ColumnName": "<DIMENSION_COLUMN_NAME>"}}
                  }}
                }}],
                "Values": [{{
                  "NumericalMeasureField": {{
                    "FieldId": "<MEASURE_FIELD_ID>",
                    "Column": {{"DataSetIdentifier": "{DATASET_PLACEHOLDER}", "ColumnName": "<MEASURE_COLUMN_NAME>"}},
                    "AggregationFunction": {{"SimpleNumericalAggregation": "<AGGREGATION_TYPE>"}}
                  }}
                }}]
              }}
            }},
            "SortConfiguration": {{
              "CategorySort": [{{"<SORT_TYPE>": {{"FieldId": "<DIMENSION_FIELD_ID>", "Direction": "<SORT_DIRECTION>"}}}}]
            }}
          }}
        }}
      }}]
    }}],
    "CalculatedFields": [<CALCULATED_FIELDS>]
  }}
}}"#
    )
}

/// Prompt for model-mode template filling.
pub fn definition_generator() -> String {
    format!(
        "{DEFINITION_GENERATOR_ROLE} Fill the JSON template below using ONLY values from the visualization plan.

RULES:
- DIMENSION_FIELD_ID and DIMENSION_COLUMN_NAME come from DIMENSION_FIELDS; MEASURE_FIELD_ID and MEASURE_COLUMN_NAME from MEASURE_FIELDS.
- If AGGREGATION_FUNCTION_REQUIRED is True, AGGREGATION_TYPE is the plan's aggregation. If False, remove the AggregationFunction key.
- If CALCULATED_FIELDS_REQUIRED is True, CalculatedFields holds one {{\"DataSetIdentifier\": \"{DATASET_PLACEHOLDER}\", \"Name\": ..., \"Expression\": ...}} per calculated field. If False, CalculatedFields is an empty list.
- Never change a DataSetIdentifier value.
- Copy plan values exactly; do not abbreviate or rename.
- Output ONLY the JSON document, no headers or footers.

JSON DEFINITION TEMPLATE:
{}",
        definition_template()
    )
}

/// User message carrying the rendered plan.
pub fn definition_generator_input(plan: &str) -> String {
    format!("Prepare the json definition from the visualisation plan: {plan}")
}

/// Prompt classifying a hosting request into action and analysis name.
pub fn hosting_intent() -> String {
    format!(
        "{HOSTING_INTENT_ROLE} Decide what the user wants done with their analyses.

ACTIONS:
- create: create a new analysis from the current definition
- update: change an existing analysis
- list: show existing analyses (also use this for an update that names no analysis)
- retry: try the last failed action again
- none: anything else

Use the exact analysis name the user gave, or null when none was given.

OUTPUT FORMAT (JSON only):
{{\"action\": \"create|update|list|retry|none\", \"analysis_name\": \"...\" or null}}"
    )
}

/// Prompt classifying a turn as insight, visualize or publish.
pub fn turn_router() -> String {
    format!(
        "{TURN_ROUTER_ROLE} Route the user's latest message to one workflow.

INTENTS:
- insight: questions about the data, or SQL to run against it
- visualize: requests to chart, plot or visualize data or a previous answer
- publish: requests to create, update, list or retry dashboard analyses

OUTPUT FORMAT (JSON only):
{{\"intent\": \"insight|visualize|publish\"}}"
    )
}

/// Recent transcript followed by the latest message.
pub fn turn_router_input(transcript: &str, message: &str) -> String {
    if transcript.is_empty() {
        format!("Latest message: {message}")
    } else {
        format!("Conversation so far:\n{transcript}\n\nLatest message: {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_is_valid_json_shape_after_placeholder_fill() {
        let filled = definition_template().replace("<CALCULATED_FIELDS>", "");
        let value: serde_json::Value = serde_json::from_str(&filled).unwrap();
        assert!(value["Definition"]["Sheets"].is_array());
    }

    #[test]
    fn test_visual_planner_lists_catalog() {
        let prompt = visual_planner();
        for visual in VisualType::ALL {
            assert!(prompt.contains(visual.as_str()));
        }
        assert!(prompt.contains("DISTINCT_COUNT"));
    }

    #[test]
    fn test_roles_are_distinct() {
        let roles = [
            QUERY_PLANNER_ROLE,
            DOMAIN_SELECTOR_ROLE,
            SQL_ANALYZER_ROLE,
            VISUAL_PLANNER_ROLE,
            DEFINITION_GENERATOR_ROLE,
            HOSTING_INTENT_ROLE,
            TURN_ROUTER_ROLE,
        ];
        let unique: std::collections::HashSet<_> = roles.iter().collect();
        assert_eq!(unique.len(), roles.len());
    }
}
