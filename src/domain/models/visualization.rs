//! Visualization catalog and the structured plan produced by the planner.
//!
//! The planner answers in `KEY: value` lines. The raw text is what gets
//! stored in the workflow state; [`VisualizationPlan::parse`] gives the typed
//! view the definition generator validates and patches against.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::{DomainError, DomainResult};

/// Chart and table kinds the hosting service can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisualType {
    /// Flat table
    TableVisual,
    /// Pivot table
    PivotTableVisual,
    /// Bar chart
    BarChartVisual,
    /// Key performance indicator
    KPIVisual,
    /// Pie chart
    PieChartVisual,
    /// Gauge chart
    GaugeChartVisual,
    /// Line chart
    LineChartVisual,
    /// Heat map
    HeatMapVisual,
    /// Tree map
    TreeMapVisual,
    /// Point map
    GeospatialMapVisual,
    /// Filled (choropleth) map
    FilledMapVisual,
    /// Layered map
    LayerMapVisual,
    /// Funnel chart
    FunnelChartVisual,
    /// Scatter plot
    ScatterPlotVisual,
    /// Combo chart
    ComboChartVisual,
    /// Box plot
    BoxPlotVisual,
    /// Waterfall chart
    WaterfallVisual,
    /// Histogram
    HistogramVisual,
    /// Word cloud
    WordCloudVisual,
    /// Narrative insight
    InsightVisual,
    /// Sankey diagram
    SankeyDiagramVisual,
    /// Embedded web page, image or text
    CustomContentVisual,
    /// Placeholder without content
    EmptyVisual,
    /// Radar chart
    RadarChartVisual,
    /// Third-party plugin visual
    PluginVisual,
}

impl VisualType {
    /// Every visual type, in prompt order.
    pub const ALL: [VisualType; 25] = [
        Self::TableVisual,
        Self::PivotTableVisual,
        Self::BarChartVisual,
        Self::KPIVisual,
        Self::PieChartVisual,
        Self::GaugeChartVisual,
        Self::LineChartVisual,
        Self::HeatMapVisual,
        Self::TreeMapVisual,
        Self::GeospatialMapVisual,
        Self::FilledMapVisual,
        Self::LayerMapVisual,
        Self::FunnelChartVisual,
        Self::ScatterPlotVisual,
        Self::ComboChartVisual,
        Self::BoxPlotVisual,
        Self::WaterfallVisual,
        Self::HistogramVisual,
        Self::WordCloudVisual,
        Self::InsightVisual,
        Self::SankeyDiagramVisual,
        Self::CustomContentVisual,
        Self::EmptyVisual,
        Self::RadarChartVisual,
        Self::PluginVisual,
    ];

    /// Name as it appears in definitions and plans.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TableVisual => "TableVisual",
            Self::PivotTableVisual => "PivotTableVisual",
            Self::BarChartVisual => "BarChartVisual",
            Self::KPIVisual => "KPIVisual",
            Self::PieChartVisual => "PieChartVisual",
            Self::GaugeChartVisual => "GaugeChartVisual",
            Self::LineChartVisual => "LineChartVisual",
            Self::HeatMapVisual => "HeatMapVisual",
            Self::TreeMapVisual => "TreeMapVisual",
            Self::GeospatialMapVisual => "GeospatialMapVisual",
            Self::FilledMapVisual => "FilledMapVisual",
            Self::LayerMapVisual => "LayerMapVisual",
            Self::FunnelChartVisual => "FunnelChartVisual",
            Self::ScatterPlotVisual => "ScatterPlotVisual",
            Self::ComboChartVisual => "ComboChartVisual",
            Self::BoxPlotVisual => "BoxPlotVisual",
            Self::WaterfallVisual => "WaterfallVisual",
            Self::HistogramVisual => "HistogramVisual",
            Self::WordCloudVisual => "WordCloudVisual",
            Self::InsightVisual => "InsightVisual",
            Self::SankeyDiagramVisual => "SankeyDiagramVisual",
            Self::CustomContentVisual => "CustomContentVisual",
            Self::EmptyVisual => "EmptyVisual",
            Self::RadarChartVisual => "RadarChartVisual",
            Self::PluginVisual => "PluginVisual",
        }
    }

    /// The aggregated field-wells type a visual of this kind uses.
    ///
    /// Layer maps, insights, custom content, empty and plugin visuals have no
    /// aggregated field wells.
    pub fn field_wells(self) -> Option<FieldWellsType> {
        let wells = match self {
            Self::TableVisual => FieldWellsType::TableAggregatedFieldWells,
            Self::PivotTableVisual => FieldWellsType::PivotTableAggregatedFieldWells,
            Self::BarChartVisual => FieldWellsType::BarChartAggregatedFieldWells,
            Self::KPIVisual => FieldWellsType::KPIAggregatedFieldWells,
            Self::PieChartVisual => FieldWellsType::PieChartAggregatedFieldWells,
            Self::GaugeChartVisual => FieldWellsType::GaugeChartAggregatedFieldWells,
            Self::LineChartVisual => FieldWellsType::LineChartAggregatedFieldWells,
            Self::HeatMapVisual => FieldWellsType::HeatMapAggregatedFieldWells,
            Self::TreeMapVisual => FieldWellsType::TreeMapAggregatedFieldWells,
            Self::GeospatialMapVisual => FieldWellsType::GeospatialMapAggregatedFieldWells,
            Self::FilledMapVisual => FieldWellsType::FilledMapAggregatedFieldWells,
            Self::FunnelChartVisual => FieldWellsType::FunnelChartAggregatedFieldWells,
            Self::ScatterPlotVisual => FieldWellsType::ScatterPlotAggregatedFieldWells,
            Self::ComboChartVisual => FieldWellsType::ComboChartAggregatedFieldWells,
            Self::BoxPlotVisual => FieldWellsType::BoxPlotAggregatedFieldWells,
            Self::WaterfallVisual => FieldWellsType::WaterfallAggregatedFieldWells,
            Self::HistogramVisual => FieldWellsType::HistogramAggregatedFieldWells,
            Self::WordCloudVisual => FieldWellsType::WordCloudAggregatedFieldWells,
            Self::SankeyDiagramVisual => FieldWellsType::SankeyDiagramAggregatedFieldWells,
            Self::RadarChartVisual => FieldWellsType::RadarChartAggregatedFieldWells,
            Self::LayerMapVisual
            | Self::InsightVisual
            | Self::CustomContentVisual
            | Self::EmptyVisual
            | Self::PluginVisual => return None,
        };
        Some(wells)
    }
}

impl fmt::Display for VisualType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisualType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::Plan(format!("unknown visual type '{s}'")))
    }
}

/// Named field-well slots a visual type exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldWellsType {
    /// Field wells of a flat table
    TableAggregatedFieldWells,
    /// Field wells of a pivot table
    PivotTableAggregatedFieldWells,
    /// Field wells of a bar chart
    BarChartAggregatedFieldWells,
    /// Field wells of a key performance indicator
    KPIAggregatedFieldWells,
    /// Field wells of a pie chart
    PieChartAggregatedFieldWells,
    /// Field wells of a gauge chart
    GaugeChartAggregatedFieldWells,
    /// Field wells of a line chart
    LineChartAggregatedFieldWells,
    /// Field wells of a heat map
    HeatMapAggregatedFieldWells,
    /// Field wells of a tree map
    TreeMapAggregatedFieldWells,
    /// Field wells of a point map
    GeospatialMapAggregatedFieldWells,
    /// Field wells of a filled (choropleth) map
    FilledMapAggregatedFieldWells,
    /// Field wells of a funnel chart
    FunnelChartAggregatedFieldWells,
    /// Field wells of a scatter plot
    ScatterPlotAggregatedFieldWells,
    /// Field wells of a combo chart
    ComboChartAggregatedFieldWells,
    /// Field wells of a box plot
    BoxPlotAggregatedFieldWells,
    /// Field wells of a waterfall chart
    WaterfallAggregatedFieldWells,
    /// Field wells of a histogram
    HistogramAggregatedFieldWells,
    /// Field wells of a word cloud
    WordCloudAggregatedFieldWells,
    /// Field wells of a sankey diagram
    SankeyDiagramAggregatedFieldWells,
    /// Field wells of a radar chart
    RadarChartAggregatedFieldWells,
}

impl FieldWellsType {
    /// Every field-wells type, in prompt order.
    pub const ALL: [FieldWellsType; 20] = [
        Self::TableAggregatedFieldWells,
        Self::PivotTableAggregatedFieldWells,
        Self::BarChartAggregatedFieldWells,
        Self::KPIAggregatedFieldWells,
        Self::PieChartAggregatedFieldWells,
        Self::GaugeChartAggregatedFieldWells,
        Self::LineChartAggregatedFieldWells,
        Self::HeatMapAggregatedFieldWells,
        Self::TreeMapAggregatedFieldWells,
        Self::GeospatialMapAggregatedFieldWells,
        Self::FilledMapAggregatedFieldWells,
        Self::FunnelChartAggregatedFieldWells,
        Self::ScatterPlotAggregatedFieldWells,
        Self::ComboChartAggregatedFieldWells,
        Self::BoxPlotAggregatedFieldWells,
        Self::WaterfallAggregatedFieldWells,
        Self::HistogramAggregatedFieldWells,
        Self::WordCloudAggregatedFieldWells,
        Self::SankeyDiagramAggregatedFieldWells,
        Self::RadarChartAggregatedFieldWells,
    ];

    /// Name as it appears in definitions and plans.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TableAggregatedFieldWells => "TableAggregatedFieldWells",
            Self::PivotTableAggregatedFieldWells => "PivotTableAggregatedFieldWells",
            Self::BarChartAggregatedFieldWells => "BarChartAggregatedFieldWells",
            Self::KPIAggregatedFieldWells => "KPIAggregatedFieldWells",
            Self::PieChartAggregatedFieldWells => "PieChartAggregatedFieldWells",
            Self::GaugeChartAggregatedFieldWells => "GaugeChartAggregatedFieldWells",
            Self::LineChartAggregatedFieldWells => "LineChartAggregatedFieldWells",
            Self::HeatMapAggregatedFieldWells => "HeatMapAggregatedFieldWells",
            Self::TreeMapAggregatedFieldWells => "TreeMapAggregatedFieldWells",
            Self::GeospatialMapAggregatedFieldWells => "GeospatialMapAggregatedFieldWells",
            Self::FilledMapAggregatedFieldWells => "FilledMapAggregatedFieldWells",
            Self::FunnelChartAggregatedFieldWells => "FunnelChartAggregatedFieldWells",
            Self::ScatterPlotAggregatedFieldWells => "ScatterPlotAggregatedFieldWells",
            Self::ComboChartAggregatedFieldWells => "ComboChartAggregatedFieldWells",
            Self::BoxPlotAggregatedFieldWells => "BoxPlotAggregatedFieldWells",
            Self::WaterfallAggregatedFieldWells => "WaterfallAggregatedFieldWells",
            Self::HistogramAggregatedFieldWells => "HistogramAggregatedFieldWells",
            Self::WordCloudAggregatedFieldWells => "WordCloudAggregatedFieldWells",
            Self::SankeyDiagramAggregatedFieldWells => "SankeyDiagramAggregatedFieldWells",
            Self::RadarChartAggregatedFieldWells => "RadarChartAggregatedFieldWells",
        }
    }
}

impl fmt::Display for FieldWellsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldWellsType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|w| w.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::Plan(format!("unknown field wells type '{s}'")))
    }
}

/// Numeric aggregation applied to a measure field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregationFunction {
    /// Sum of values
    Sum,
    /// Arithmetic mean
    Average,
    /// Smallest value
    Min,
    /// Largest value
    Max,
    /// Number of values
    Count,
    /// Number of distinct values
    DistinctCount,
    /// Sample variance
    Var,
    /// Population variance
    Varp,
    /// Sample standard deviation
    Stdev,
    /// Population standard deviation
    Stdevp,
    /// Median value
    Median,
}

impl AggregationFunction {
    /// Every aggregation, in prompt order.
    pub const ALL: [AggregationFunction; 11] = [
        Self::Sum,
        Self::Average,
        Self::Min,
        Self::Max,
        Self::Count,
        Self::DistinctCount,
        Self::Var,
        Self::Varp,
        Self::Stdev,
        Self::Stdevp,
        Self::Median,
    ];

    /// Value of `SimpleNumericalAggregation`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "SUM",
            Self::Average => "AVERAGE",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Count => "COUNT",
            Self::DistinctCount => "DISTINCT_COUNT",
            Self::Var => "VAR",
            Self::Varp => "VARP",
            Self::Stdev => "STDEV",
            Self::Stdevp => "STDEVP",
            Self::Median => "MEDIAN",
        }
    }

    /// Find the first aggregation named as a whole word in free text.
    ///
    /// Accepts both the bare name and the
    /// `"AggregationFunction": {"SimpleNumericalAggregation": "SUM"}` form.
    pub fn find_in(text: &str) -> Option<Self> {
        text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .filter(|token| !token.is_empty())
            .find_map(|token| token.parse().ok())
    }
}

impl fmt::Display for AggregationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationFunction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_matches('"');
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::Plan(format!("unknown aggregation function '{s}'")))
    }
}

/// Whether the category sort references a field well or a raw column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortType {
    /// Sort by a field in the field wells
    FieldSort,
    /// Sort by a dataset column
    ColumnSort,
}

impl SortType {
    /// Key of the sort configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FieldSort => "FieldSort",
            Self::ColumnSort => "ColumnSort",
        }
    }
}

impl FromStr for SortType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fieldsort" => Ok(Self::FieldSort),
            "columnsort" => Ok(Self::ColumnSort),
            other => Err(DomainError::Plan(format!("unknown sort type '{other}'"))),
        }
    }
}

/// Category sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

impl SortDirection {
    /// Value of the sort `Direction`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" | "ASCENDING" => Ok(Self::Asc),
            "DESC" | "DESCENDING" => Ok(Self::Desc),
            other => Err(DomainError::Plan(format!("unknown sort direction '{other}'"))),
        }
    }
}

/// A `name = expression` calculated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedField {
    /// Field name referenced by the wells
    pub name: String,
    /// Expression in the hosting service's formula language
    pub expression: String,
}

/// Typed view of the planner's key-value output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizationPlan {
    /// Chart or table kind
    pub visual_type: VisualType,
    /// Always the wells type of `visual_type` after parsing
    pub field_wells_type: FieldWellsType,
    /// Category columns
    pub dimension_fields: Vec<String>,
    /// Value columns
    pub measure_fields: Vec<String>,
    /// Whether measures are aggregated
    pub aggregation_required: bool,
    /// Set when `aggregation_required`
    pub aggregation_function: Option<AggregationFunction>,
    /// Sort reference kind
    pub sort_type: SortType,
    /// Sort order
    pub sort_direction: SortDirection,
    /// Filters the planner suggested; informational only
    #[serde(default)]
    pub filter_types: Vec<String>,
    /// Whether `calculated_fields` is used
    pub calculated_fields_required: bool,
    /// Derived fields to declare in the definition
    #[serde(default)]
    pub calculated_fields: Vec<CalculatedField>,
    /// Human-readable rationale
    #[serde(default)]
    pub summary: String,
}

impl VisualizationPlan {
    /// Parse the planner's `KEY: value` output.
    ///
    /// Keys may carry list markers or markdown emphasis (`- **VISUAL_TYPE**:`).
    /// Everything after `SUMMARY:` is taken as the summary.
    pub fn parse(text: &str) -> DomainResult<Self> {
        let mut fields = RawPlanFields::default();
        let mut in_summary = false;

        for line in text.lines() {
            if in_summary {
                if !fields.summary.is_empty() || !line.trim().is_empty() {
                    fields.summary.push('\n');
                    fields.summary.push_str(line);
                }
                continue;
            }

            let Some((key, value)) = split_key_value(line) else {
                continue;
            };
            let value = value.trim();
            match key.as_str() {
                "VISUAL_TYPE" => fields.visual_type = Some(value.to_string()),
                "FIELD_WELLS_TYPE" => fields.field_wells_type = Some(value.to_string()),
                "DIMENSION_FIELDS" => fields.dimension_fields = parse_field_list(value),
                "MEASURE_FIELDS" => fields.measure_fields = parse_field_list(value),
                "AGGREGATION_FUNCTION_REQUIRED" => {
                    fields.aggregation_required = Some(parse_bool(value)?);
                }
                "AGGREGATION_FUNCTIONS" | "AGGREGATION_FUNCTION" => {
                    fields.aggregation_function = AggregationFunction::find_in(value);
                }
                "SORT_TYPE" => fields.sort_type = Some(value.parse()?),
                "SORT_DIRECTION" => fields.sort_direction = Some(value.parse()?),
                "FILTER_TYPES" => fields.filter_types = parse_field_list(value),
                "CALCULATED_FIELDS_REQUIRED" => {
                    fields.calculated_fields_required = Some(parse_bool(value)?);
                }
                "CALCULATED_FIELDS" => fields.calculated_fields = parse_calculated_fields(value),
                "SUMMARY" => {
                    in_summary = true;
                    fields.summary = value.to_string();
                }
                _ => {}
            }
        }

        fields.into_plan()
    }

    /// Render the plan back into the canonical key-value text.
    pub fn render(&self) -> String {
        let quote_list = |items: &[String]| {
            serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
        };

        let mut lines = vec![
            format!("VISUAL_TYPE: {}", self.visual_type),
            format!("FIELD_WELLS_TYPE: {}", self.field_wells_type),
            format!("DIMENSION_FIELDS: {}", quote_list(&self.dimension_fields)),
            format!("MEASURE_FIELDS: {}", quote_list(&self.measure_fields)),
            format!(
                "AGGREGATION_FUNCTION_REQUIRED: {}",
                render_bool(self.aggregation_required)
            ),
        ];
        if let Some(function) = self.aggregation_function {
            lines.push(format!(
                "AGGREGATION_FUNCTIONS: \"AggregationFunction\": {{\"SimpleNumericalAggregation\": \"{function}\"}}"
            ));
        }
        lines.push(format!("SORT_TYPE: {}", self.sort_type.as_str()));
        lines.push(format!("SORT_DIRECTION: {}", self.sort_direction.as_str()));
        if !self.filter_types.is_empty() {
            lines.push(format!("FILTER_TYPES: {}", quote_list(&self.filter_types)));
        }
        lines.push(format!(
            "CALCULATED_FIELDS_REQUIRED: {}",
            render_bool(self.calculated_fields_required)
        ));
        if !self.calculated_fields.is_empty() {
            let map: serde_json::Map<String, serde_json::Value> = self
                .calculated_fields
                .iter()
                .map(|f| (f.name.clone(), serde_json::Value::String(f.expression.clone())))
                .collect();
            lines.push(format!(
                "CALCULATED_FIELDS: {}",
                serde_json::Value::Object(map)
            ));
        }
        if !self.summary.is_empty() {
            lines.push(String::new());
            lines.push(format!("SUMMARY: {}", self.summary));
        }
        lines.join("\n")
    }

    /// First dimension field; every valid plan has one.
    pub fn primary_dimension(&self) -> &str {
        self.dimension_fields.first().map_or("", String::as_str)
    }

    /// First measure field; every valid plan has one.
    pub fn primary_measure(&self) -> &str {
        self.measure_fields.first().map_or("", String::as_str)
    }
}

#[derive(Default)]
struct RawPlanFields {
    visual_type: Option<String>,
    field_wells_type: Option<String>,
    dimension_fields: Vec<String>,
    measure_fields: Vec<String>,
    aggregation_required: Option<bool>,
    aggregation_function: Option<AggregationFunction>,
    sort_type: Option<SortType>,
    sort_direction: Option<SortDirection>,
    filter_types: Vec<String>,
    calculated_fields_required: Option<bool>,
    calculated_fields: Vec<CalculatedField>,
    summary: String,
}

impl RawPlanFields {
    fn into_plan(self) -> DomainResult<VisualizationPlan> {
        let visual_type: VisualType = self
            .visual_type
            .ok_or_else(|| missing("VISUAL_TYPE"))?
            .parse()?;

        // The catalog mapping wins over whatever the planner wrote.
        let field_wells_type = match visual_type.field_wells() {
            Some(canonical) => {
                if let Some(stated) = self.field_wells_type.as_deref() {
                    if stated.parse::<FieldWellsType>().ok() != Some(canonical) {
                        tracing::warn!(
                            visual_type = %visual_type,
                            stated,
                            canonical = %canonical,
                            "field wells type does not match visual type, using canonical mapping"
                        );
                    }
                }
                canonical
            }
            None => self
                .field_wells_type
                .ok_or_else(|| missing("FIELD_WELLS_TYPE"))?
                .parse()?,
        };

        if self.dimension_fields.is_empty() {
            return Err(missing("DIMENSION_FIELDS"));
        }
        if self.measure_fields.is_empty() {
            return Err(missing("MEASURE_FIELDS"));
        }

        let aggregation_required = self
            .aggregation_required
            .ok_or_else(|| missing("AGGREGATION_FUNCTION_REQUIRED"))?;
        let aggregation_function = if aggregation_required {
            Some(
                self.aggregation_function
                    .ok_or_else(|| missing("AGGREGATION_FUNCTIONS"))?,
            )
        } else {
            None
        };

        let calculated_fields_required = self
            .calculated_fields_required
            .ok_or_else(|| missing("CALCULATED_FIELDS_REQUIRED"))?;
        let calculated_fields = if calculated_fields_required {
            if self.calculated_fields.is_empty() {
                return Err(missing("CALCULATED_FIELDS"));
            }
            self.calculated_fields
        } else {
            Vec::new()
        };

        Ok(VisualizationPlan {
            visual_type,
            field_wells_type,
            dimension_fields: self.dimension_fields,
            measure_fields: self.measure_fields,
            aggregation_required,
            aggregation_function,
            sort_type: self.sort_type.unwrap_or(SortType::FieldSort),
            sort_direction: self.sort_direction.unwrap_or(SortDirection::Desc),
            filter_types: self.filter_types,
            calculated_fields_required,
            calculated_fields,
            summary: self.summary.trim().to_string(),
        })
    }
}

fn missing(key: &str) -> DomainError {
    DomainError::Plan(format!("missing required key {key}"))
}

/// Split `- **KEY**: value` into the normalized key and the value.
fn split_key_value(line: &str) -> Option<(String, &str)> {
    let (raw_key, value) = line.split_once(':')?;
    let key = raw_key
        .trim()
        .trim_start_matches(['-', '*', ' '])
        .trim_end_matches(['*', ' '])
        .trim()
        .to_ascii_uppercase()
        .replace(' ', "_");
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
        return None;
    }
    Some((key, value))
}

fn parse_bool(value: &str) -> DomainResult<bool> {
    match value.trim().trim_matches('"').to_ascii_lowercase().as_str() {
        "true" | "yes" => Ok(true),
        "false" | "no" => Ok(false),
        other => Err(DomainError::Plan(format!("expected True or False, got '{other}'"))),
    }
}

fn render_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Accepts `["a", "b"]` or a bare comma-separated list.
fn parse_field_list(value: &str) -> Vec<String> {
    if let Ok(items) = serde_json::from_str::<Vec<String>>(value) {
        return items.into_iter().map(|s| s.trim().to_string()).collect();
    }
    value
        .trim_matches(['[', ']'])
        .split(',')
        .map(|s| s.trim().trim_matches(['"', '\'', '`']).trim().to_string())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("none"))
        .collect()
}

/// Accepts `{"name": "expr"}` or `name = expr` (comma separated).
fn parse_calculated_fields(value: &str) -> Vec<CalculatedField> {
    if let Ok(map) = serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(value) {
        return map
            .into_iter()
            .map(|(name, expr)| CalculatedField {
                name,
                expression: expr.as_str().map_or_else(|| expr.to_string(), str::to_string),
            })
            .collect();
    }
    split_top_level(value)
        .into_iter()
        .filter_map(|pair| {
            let (name, expr) = pair.split_once('=')?;
            let name = name.trim().trim_matches('"');
            let expr = expr.trim().trim_matches('"');
            (!name.is_empty() && !expr.is_empty()).then(|| CalculatedField {
                name: name.to_string(),
                expression: expr.to_string(),
            })
        })
        .collect()
}

/// Split on commas outside parentheses and double quotes.
fn split_top_level(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut start = 0;
    for (index, ch) in value.char_indices() {
        match ch {
            '"' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth = depth.saturating_sub(1),
            ',' if !in_quote && depth == 0 => {
                parts.push(&value[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}
