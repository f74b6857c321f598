//! Typed configuration sections with serde defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure for insightflow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Completion service configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Retrieve-and-generate endpoint configuration
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,

    /// Knowledge domains the insight responder can route questions to
    #[serde(default = "default_knowledge_domains")]
    pub knowledge_domains: Vec<KnowledgeDomainConfig>,

    /// Dashboard-hosting service configuration
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Dataset referenced by every generated definition
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Definition generation settings
    #[serde(default)]
    pub definition: DefinitionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            llm: LlmConfig::default(),
            knowledge_base: KnowledgeBaseConfig::default(),
            knowledge_domains: default_knowledge_domains(),
            dashboard: DashboardConfig::default(),
            dataset: DatasetConfig::default(),
            definition: DefinitionConfig::default(),
        }
    }
}

impl Config {
    /// Look up a knowledge domain by name (case-insensitive).
    pub fn domain(&self, name: &str) -> Option<&KnowledgeDomainConfig> {
        self.knowledge_domains
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name.trim()))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stderr only when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Rotation policy for log files: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Completion service (Anthropic Messages API) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LlmConfig {
    /// Base URL for the API (for testing/proxies)
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// API key (can also be set via ANTHROPIC_API_KEY env var)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model used for every agent step
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API version header
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Max tokens to generate per call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_llm_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

const fn default_max_tokens() -> u32 {
    4096
}

const fn default_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: None,
            model: default_llm_model(),
            api_version: default_api_version(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Retrieve-and-generate endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct KnowledgeBaseConfig {
    /// Base URL of the retrieval gateway
    #[serde(default = "default_kb_base_url")]
    pub base_url: String,

    /// Bearer token for the gateway (can also be set via INSIGHTFLOW_KB_TOKEN)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Model the knowledge base generates answers with
    #[serde(default = "default_model_arn")]
    pub model_arn: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_kb_base_url() -> String {
    "https://bedrock-agent-runtime.us-west-2.amazonaws.com".to_string()
}

fn default_model_arn() -> String {
    "arn:aws:bedrock:us-west-2::foundation-model/anthropic.claude-3-5-sonnet-20241022-v2:0"
        .to_string()
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            base_url: default_kb_base_url(),
            api_token: None,
            model_arn: default_model_arn(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// A knowledge base together with the schema its query planner describes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct KnowledgeDomainConfig {
    /// Short domain name used for routing (e.g. "ecommerce")
    pub name: String,

    /// What kinds of questions belong to this domain
    #[serde(default)]
    pub description: String,

    /// Knowledge base identifier passed to the retrieval endpoint
    pub knowledge_base_id: String,

    /// Table and column listing given to the query planner
    pub schema: String,
}

/// Schema of the default fashion e-commerce knowledge base.
pub const ECOMMERCE_SCHEMA: &str = "- public
    - dataset_fashion_store_sales (sale_id, channel, discounted, total_amount, start_date, customer_id, country)
    - dataset_fashion_store_customers (customer_id, country, age_range, signup_date)
    - dataset_fashion_store_stock (country, product_id, stock_quantity)
    - dataset_fashion_store_products (product_id, product_name, category, brand, color, size, catalog_price, cost_price, gender)
    - dataset_fashion_store_salesitems (item_id, sale_id, product_id, quantity, original_price, unit_price, discount_applied, discount_percent, discounted, item_total, sale_date, channel, channel_campaigns)
    - dataset_fashion_store_campaigns (campaign_id, campaign_name, start_date, end_date, channel, discount_type, discount_value)
    - dataset_fashion_store_channels (channel, description)";

fn default_knowledge_domains() -> Vec<KnowledgeDomainConfig> {
    vec![KnowledgeDomainConfig {
        name: "ecommerce".to_string(),
        description: "Sales, sales items, customers, products, campaigns, channels and stock"
            .to_string(),
        knowledge_base_id: "QCQ10YU9FE".to_string(),
        schema: ECOMMERCE_SCHEMA.to_string(),
    }]
}

/// Dashboard-hosting service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DashboardConfig {
    /// Base URL of the hosting API
    #[serde(default = "default_dashboard_base_url")]
    pub base_url: String,

    /// Bearer token for the hosting API (can also be set via INSIGHTFLOW_DASHBOARD_TOKEN)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Account that owns created analyses
    #[serde(default = "default_account_id")]
    pub account_id: String,

    /// Principal granted access to every created analysis
    #[serde(default = "default_principal_arn")]
    pub principal_arn: String,

    /// Actions granted to the principal
    #[serde(default = "default_permission_actions")]
    pub permission_actions: Vec<String>,

    /// Analysis name used when the user supplies none
    #[serde(default = "default_analysis_name")]
    pub default_analysis_name: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_dashboard_base_url() -> String {
    "https://quicksight.us-west-2.amazonaws.com".to_string()
}

fn default_account_id() -> String {
    "000000000000".to_string()
}

fn default_principal_arn() -> String {
    "arn:aws:quicksight:us-west-2:000000000000:user/default/insightflow".to_string()
}

fn default_permission_actions() -> Vec<String> {
    [
        "quicksight:RestoreAnalysis",
        "quicksight:UpdateAnalysisPermissions",
        "quicksight:DeleteAnalysis",
        "quicksight:QueryAnalysis",
        "quicksight:DescribeAnalysisPermissions",
        "quicksight:DescribeAnalysis",
        "quicksight:UpdateAnalysis",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn default_analysis_name() -> String {
    "insightflow-analysis".to_string()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: default_dashboard_base_url(),
            api_token: None,
            account_id: default_account_id(),
            principal_arn: default_principal_arn(),
            permission_actions: default_permission_actions(),
            default_analysis_name: default_analysis_name(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Dataset every generated definition is bound to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct DatasetConfig {
    /// Dataset ARN written into the identifier declaration
    #[serde(default = "default_dataset_arn")]
    pub arn: String,

    /// Identifier that replaces the template placeholder
    #[serde(default = "default_dataset_identifier")]
    pub identifier: String,
}

fn default_dataset_arn() -> String {
    "arn:aws:quicksight:us-west-2:000000000000:dataset/4485d828-ce32-44bf-b38e-75fa8fcd571c"
        .to_string()
}

fn default_dataset_identifier() -> String {
    "4485d828-ce32-44bf-b38e-75fa8fcd571c".to_string()
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            arn: default_dataset_arn(),
            identifier: default_dataset_identifier(),
        }
    }
}

/// How the definition generator fills the template
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// The completion service fills the template; output is then patched to the plan
    #[default]
    Model,
    /// Deterministic substitution from the parsed plan
    Template,
}

/// Definition generation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DefinitionConfig {
    #[serde(default)]
    pub mode: GenerationMode,
}
