//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use insightflow::adapters::dashboard::InMemoryDashboardHost;
use insightflow::adapters::knowledge_base::InMemoryKnowledgeBase;
use insightflow::adapters::llm::{MockCompletionProvider, MockResponse};
use insightflow::cli::app::coordinator_with;
use insightflow::domain::models::{Config, GenerationMode};
use insightflow::services::{prompts, Coordinator};

pub const SQL: &str = "SELECT p.category, SUM(si.item_total) AS total_revenue \
FROM dataset_fashion_store_salesitems si \
JOIN dataset_fashion_store_products p ON si.product_id = p.product_id \
GROUP BY p.category ORDER BY total_revenue DESC";

pub const ANSWER: &str = "Accessories generated the most revenue, followed by Shoes.";

pub const QUERY_PLAN: &str =
    "Join salesitems to products on product_id and sum item_total per category.";

pub const BREAKDOWN: &str = r#"{"column_names": ["category", "item_total", "product_id"], "table_names": ["dataset_fashion_store_salesitems", "dataset_fashion_store_products"]}"#;

pub const BAR_PLAN: &str = "- **VISUAL_TYPE**: BarChartVisual
- **FIELD_WELLS_TYPE**: BarChartAggregatedFieldWells
- **DIMENSION_FIELDS**: [\"category\"]
- **MEASURE_FIELDS**: [\"total_revenue\"]
- **AGGREGATION_FUNCTION_REQUIRED**: True
- **AGGREGATION_FUNCTIONS**: \"AggregationFunction\": {\"SimpleNumericalAggregation\": \"SUM\"}
- **SORT_TYPE**: FieldSort
- **SORT_DIRECTION**: DESC
- **FILTER_TYPES**: []
- **CALCULATED_FIELDS_REQUIRED**: False
- **SUMMARY**: A bar chart of revenue per product category, sorted from highest to lowest.";

pub struct Harness {
    pub coordinator: Coordinator,
    pub provider: Arc<MockCompletionProvider>,
    pub knowledge_base: Arc<InMemoryKnowledgeBase>,
    pub host: Arc<InMemoryDashboardHost>,
    pub config: Config,
}

/// Coordinator on in-memory adapters with every agent role scripted except
/// the turn router and the hosting classifier, which tests queue per turn.
pub async fn harness(mode: GenerationMode) -> Harness {
    let mut config = Config::default();
    config.definition.mode = mode;

    let provider = Arc::new(MockCompletionProvider::new());
    provider
        .on_system_prompt(prompts::QUERY_PLANNER_ROLE, MockResponse::success(QUERY_PLAN))
        .await;
    provider
        .on_system_prompt(prompts::SQL_ANALYZER_ROLE, MockResponse::success(BREAKDOWN))
        .await;
    provider
        .on_system_prompt(prompts::VISUAL_PLANNER_ROLE, MockResponse::success(BAR_PLAN))
        .await;

    let knowledge_base = Arc::new(InMemoryKnowledgeBase::answering(ANSWER, Some(SQL)));
    let host = Arc::new(InMemoryDashboardHost::new());
    let coordinator = coordinator_with(
        &config,
        provider.clone(),
        knowledge_base.clone(),
        host.clone(),
    );

    Harness {
        coordinator,
        provider,
        knowledge_base,
        host,
        config,
    }
}

impl Harness {
    /// Queue the router verdict for the next turn.
    pub async fn route(&self, intent: &str) {
        self.provider
            .push_response(MockResponse::success(format!(r#"{{"intent": "{intent}"}}"#)))
            .await;
    }

    /// Queue the router verdict and hosting classification for a publish turn.
    pub async fn publish(&self, action: &str, name: Option<&str>) {
        self.route("publish").await;
        let name = name.map_or_else(|| "null".to_string(), |n| format!("\"{n}\""));
        self.provider
            .push_response(MockResponse::success(format!(
                r#"{{"action": "{action}", "analysis_name": {name}}}"#
            )))
            .await;
    }
}
