//! Plans one visual from the retrieval context, the SQL breakdown and the
//! user's request.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::sql_breakdown::alias_map;
use crate::domain::models::{CompletionRequest, SqlBreakdown, VisualizationPlan, WorkflowState};
use crate::domain::ports::CompletionProvider;
use crate::services::prompts;
use crate::services::sql_analyzer::SqlBreakdownAnalyzer;

/// Raw planner text together with its typed parse.
#[derive(Debug, Clone)]
pub struct PlannedVisualization {
    /// Planner reply as received
    pub raw: String,
    /// Parsed plan with aliases resolved
    pub plan: VisualizationPlan,
    /// Breakdown the plan was built from
    pub breakdown: SqlBreakdown,
    /// False when no context SQL existed and the request itself was analyzed
    pub scoped: bool,
}

/// Visualization planning agent.
///
/// Breaks down the latest context SQL, asks the model for a plan over those
/// fields and stores the raw reply in the session before parsing it.
pub struct VisualizationPlanner {
    provider: Arc<dyn CompletionProvider>,
    analyzer: SqlBreakdownAnalyzer,
}

impl VisualizationPlanner {
    /// Create a planner; the SQL analyzer shares `provider`.
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            analyzer: SqlBreakdownAnalyzer::new(provider.clone()),
            provider,
        }
    }

    /// Produce a plan and store it in `state`.
    ///
    /// The raw text is stored even when the typed parse fails, in which case
    /// the parse error is returned.
    #[instrument(skip(self, state, request))]
    pub async fn plan(
        &self,
        state: &mut WorkflowState,
        request: &str,
    ) -> DomainResult<PlannedVisualization> {
        let context_sql = state.latest_sql().map(str::to_string);
        let scoped = context_sql.is_some();
        if !scoped {
            warn!("no context SQL, analyzing the request text instead");
        }
        let sql = context_sql.as_deref().unwrap_or(request);

        let breakdown = self.analyzer.analyze(sql).await?;

        let input = planner_input(state, request, context_sql.as_deref(), &breakdown)?;
        let raw = self
            .provider
            .complete(CompletionRequest::new(prompts::visual_planner(), input))
            .await?
            .trim()
            .to_string();

        let parsed = VisualizationPlan::parse(&raw).map(|plan| resolve_aliases(plan, sql));
        state.store_plan(raw.clone(), parsed.as_ref().ok().cloned());
        let plan = parsed?;

        info!(
            visual_type = %plan.visual_type,
            dimension = plan.primary_dimension(),
            measure = plan.primary_measure(),
            "visualization plan created"
        );
        Ok(PlannedVisualization {
            raw,
            plan,
            breakdown,
            scoped,
        })
    }
}

fn planner_input(
    state: &WorkflowState,
    request: &str,
    sql: Option<&str>,
    breakdown: &SqlBreakdown,
) -> DomainResult<String> {
    let mut input = format!("User request: {request}\n");
    if let (Some(entry), Some(sql)) = (state.latest_insight(), sql) {
        input.push_str(&format!("Context question: {}\n", entry.question));
        if let Some(plan) = &entry.response.query_plan {
            input.push_str(&format!("Query plan: {plan}\n"));
        }
        input.push_str(&format!("SQL query: {sql}\n"));
        input.push_str(&format!("Query results: {}\n", entry.response.answer));
    }
    input.push_str(&format!(
        "SQL analyzer result: {}",
        serde_json::to_string(breakdown)?
    ));
    Ok(input)
}

/// Replace any field that is an `AS` alias in `sql` with the column it wraps.
fn resolve_aliases(mut plan: VisualizationPlan, sql: &str) -> VisualizationPlan {
    let aliases = alias_map(sql);
    if aliases.is_empty() {
        return plan;
    }
    let calculated: Vec<String> = plan.calculated_fields.iter().map(|f| f.name.clone()).collect();

    for field in plan
        .dimension_fields
        .iter_mut()
        .chain(plan.measure_fields.iter_mut())
    {
        if calculated.contains(field) {
            continue;
        }
        if let Some(column) = aliases.get(&field.to_ascii_lowercase()) {
            warn!(alias = %field, column = %column, "plan used an SQL alias, using the literal column");
            *field = column.clone();
        }
    }
    plan
}
