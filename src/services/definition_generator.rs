//! Plan -> filled template -> dashboard definition.
//!
//! In model mode the completion service fills the template and the parsed
//! document is patched back onto the plan. In template mode the template is
//! filled directly. Either way post-processing swaps the dataset placeholder
//! for the configured identifier.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CompletionRequest, DashboardDefinition, DatasetConfig, GenerationMode, VisualizationPlan,
    DATASET_PLACEHOLDER,
};
use crate::domain::ports::CompletionProvider;
use crate::services::{prompts, strip_code_fences};

/// Turns a visualization plan into a post-processed dashboard definition.
pub struct DefinitionGenerator {
    provider: Arc<dyn CompletionProvider>,
    mode: GenerationMode,
    dataset: DatasetConfig,
}

impl DefinitionGenerator {
    /// Create a generator for `mode` bound to one dataset.
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        mode: GenerationMode,
        dataset: DatasetConfig,
    ) -> Self {
        Self {
            provider,
            mode,
            dataset,
        }
    }

    /// Configured generation mode.
    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    /// Build the post-processed definition for `plan`.
    ///
    /// Template mode fills the template directly. Model mode sends the
    /// rendered plan, parses the reply (code fences allowed) and conforms it
    /// to the plan. The dataset declaration is then added and every
    /// placeholder replaced with the configured identifier.
    #[instrument(skip(self, plan), fields(mode = ?self.mode, visual_type = %plan.visual_type))]
    pub async fn generate(&self, plan: &VisualizationPlan) -> DomainResult<DashboardDefinition> {
        let document = match self.mode {
            GenerationMode::Model => {
                let raw = self
                    .provider
                    .complete(CompletionRequest::new(
                        prompts::definition_generator(),
                        prompts::definition_generator_input(&plan.render()),
                    ))
                    .await?;
                let mut document = parse_definition_json(&raw)?;
                conform_to_plan(&mut document, plan);
                document
            }
            GenerationMode::Template => fill_template(plan),
        };

        add_dataset_identifier(document, &self.dataset)
    }
}

/// Parse the generator's reply, removing a surrounding markdown fence first.
pub fn parse_definition_json(raw: &str) -> DomainResult<Value> {
    let body = strip_code_fences(raw);
    serde_json::from_str(body)
        .map_err(|e| DomainError::MalformedOutput(format!("Failed to parse JSON: {e}")))
}

/// Fill the template from the plan by literal substitution.
///
/// Dataset identifiers stay the placeholder until post-processing.
pub fn fill_template(plan: &VisualizationPlan) -> Value {
    let dimension = plan.primary_dimension();
    let measure = plan.primary_measure();

    let mut measure_field = json!({
        "FieldId": measure,
        "Column": {"DataSetIdentifier": DATASET_PLACEHOLDER, "ColumnName": measure}
    });
    if let Some(function) = plan.aggregation_function {
        measure_field["AggregationFunction"] =
            json!({"SimpleNumericalAggregation": function.as_str()});
    }

    let mut field_wells = Map::new();
    field_wells.insert(
        plan.field_wells_type.as_str().to_string(),
        json!({
            "Category": [{
                "CategoricalDimensionField": {
                    "FieldId": dimension,
                    "Column": {"DataSetIdentifier": DATASET_PLACEHOLDER, "ColumnName": dimension}
                }
            }],
            "Values": [{"NumericalMeasureField": measure_field}]
        }),
    );

    let mut sort = Map::new();
    sort.insert(
        plan.sort_type.as_str().to_string(),
        json!({"FieldId": dimension, "Direction": plan.sort_direction.as_str()}),
    );

    let mut visual = Map::new();
    visual.insert(
        plan.visual_type.as_str().to_string(),
        json!({
            "VisualId": "visual1",
            "Title": {"FormatText": {"PlainText": title_for(plan)}},
            "Subtitle": {"FormatText": {"PlainText": subtitle_for(plan)}},
            "ChartConfiguration": {
                "FieldWells": field_wells,
                "SortConfiguration": {"CategorySort": [sort]}
            }
        }),
    );

    json!({
        "Definition": {
            "Sheets": [{
                "SheetId": "sheet1",
                "Name": format!("{measure} by {dimension}"),
                "Visuals": [visual]
            }],
            "CalculatedFields": calculated_fields(plan)
        }
    })
}

/// Patch a model-filled document so it agrees with the plan.
///
/// Every measure field gets the plan's aggregation, or none when the plan
/// requires none. `CalculatedFields` is emptied when not required and filled
/// from the plan when required but missing.
pub fn conform_to_plan(document: &mut Value, plan: &VisualizationPlan) {
    fn patch_measures(value: &mut Value, plan: &VisualizationPlan) {
        match value {
            Value::Object(map) => {
                for (key, child) in map.iter_mut() {
                    if key == "NumericalMeasureField" {
                        if let Value::Object(field) = child {
                            match plan.aggregation_function {
                                Some(function) => {
                                    field.insert(
                                        "AggregationFunction".to_string(),
                                        json!({"SimpleNumericalAggregation": function.as_str()}),
                                    );
                                }
                                None => {
                                    if field.remove("AggregationFunction").is_some() {
                                        debug!("removed aggregation the plan does not require");
                                    }
                                }
                            }
                        }
                    }
                    patch_measures(child, plan);
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|item| patch_measures(item, plan)),
            _ => {}
        }
    }

    let Some(definition) = document.get_mut("Definition").and_then(Value::as_object_mut) else {
        return;
    };

    for sheet in definition
        .get_mut("Sheets")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
    {
        patch_measures(sheet, plan);
    }

    let has_calculated = definition
        .get("CalculatedFields")
        .and_then(Value::as_array)
        .is_some_and(|fields| !fields.is_empty());
    if !plan.calculated_fields_required {
        if has_calculated {
            warn!("model added calculated fields the plan does not require");
        }
        definition.insert("CalculatedFields".to_string(), json!([]));
    } else if !has_calculated {
        definition.insert("CalculatedFields".to_string(), calculated_fields(plan));
    }
}

/// Declare the configured dataset and point every placeholder reference at it.
///
/// Every string value containing the placeholder is rewritten; a placeholder
/// left in an object key fails the document. Running it twice gives the same
/// document.
pub fn add_dataset_identifier(
    mut document: Value,
    dataset: &DatasetConfig,
) -> DomainResult<DashboardDefinition> {
    let definition = document
        .get_mut("Definition")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| {
            DomainError::MalformedOutput("Definition key not found in the json definition".to_string())
        })?;

    definition.insert(
        "DataSetIdentifierDeclarations".to_string(),
        json!([{"DataSetArn": dataset.arn, "Identifier": dataset.identifier}]),
    );

    let replaced = replace_placeholders(&mut document, &dataset.identifier);
    debug!(replaced, "dataset identifier applied");

    // Keys are never rewritten; a sentinel left there means the document is unusable.
    if document.to_string().contains(DATASET_PLACEHOLDER) {
        return Err(DomainError::MalformedOutput(format!(
            "{DATASET_PLACEHOLDER} left in the json definition"
        )));
    }
    DashboardDefinition::new(document)
}

fn replace_placeholders(value: &mut Value, identifier: &str) -> usize {
    match value {
        Value::String(text) if text.contains(DATASET_PLACEHOLDER) => {
            let count = text.matches(DATASET_PLACEHOLDER).count();
            *text = text.replace(DATASET_PLACEHOLDER, identifier);
            count
        }
        Value::Object(map) => map
            .values_mut()
            .map(|child| replace_placeholders(child, identifier))
            .sum(),
        Value::Array(items) => items
            .iter_mut()
            .map(|item| replace_placeholders(item, identifier))
            .sum(),
        _ => 0,
    }
}

fn calculated_fields(plan: &VisualizationPlan) -> Value {
    Value::Array(
        plan.calculated_fields
            .iter()
            .map(|field| {
                json!({
                    "DataSetIdentifier": DATASET_PLACEHOLDER,
                    "Name": field.name,
                    "Expression": field.expression
                })
            })
            .collect(),
    )
}

fn title_for(plan: &VisualizationPlan) -> String {
    let measure = plan.primary_measure();
    let dimension = plan.primary_dimension();
    match plan.aggregation_function {
        Some(function) => format!("{function} of {measure} by {dimension}"),
        None => format!("{measure} by {dimension}"),
    }
}

fn subtitle_for(plan: &VisualizationPlan) -> String {
    plan.summary
        .split_inclusive(". ")
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}
