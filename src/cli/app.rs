//! Wires configuration into adapters and services.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::adapters::dashboard::HttpDashboardHost;
use crate::adapters::knowledge_base::HttpKnowledgeBase;
use crate::adapters::llm::AnthropicCompletionProvider;
use crate::domain::models::Config;
use crate::domain::ports::{CompletionProvider, DashboardHost, KnowledgeBase};
use crate::infrastructure::config::ConfigLoader;
use crate::services::{
    Coordinator, DashboardGateway, DefinitionGenerator, InsightResponder,
    KnowledgeRetrievalClient, VisualizationPlanner,
};

/// Load from `path` when given, otherwise from the project hierarchy.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// HTTP dashboard host built from the `dashboard` section.
pub fn dashboard_host(config: &Config) -> Result<Arc<dyn DashboardHost>> {
    let host = HttpDashboardHost::new(config.dashboard.clone())
        .context("Failed to create dashboard host client")?;
    Ok(Arc::new(host))
}

/// Build a coordinator on the given collaborators.
pub fn coordinator_with(
    config: &Config,
    provider: Arc<dyn CompletionProvider>,
    knowledge_base: Arc<dyn KnowledgeBase>,
    host: Arc<dyn DashboardHost>,
) -> Coordinator {
    Coordinator::new(
        provider.clone(),
        InsightResponder::new(
            provider.clone(),
            KnowledgeRetrievalClient::new(knowledge_base),
            config.knowledge_domains.clone(),
        ),
        VisualizationPlanner::new(provider.clone()),
        DefinitionGenerator::new(
            provider.clone(),
            config.definition.mode,
            config.dataset.clone(),
        ),
        DashboardGateway::new(provider, host, config.dashboard.default_analysis_name.clone()),
    )
}

/// Build a coordinator on the HTTP adapters.
pub fn coordinator(config: &Config) -> Result<Coordinator> {
    let provider = AnthropicCompletionProvider::new(config.llm.clone())
        .context("Failed to create completion client")?;
    if provider.api_key().is_none() {
        anyhow::bail!("No API key configured. Set llm.api_key or ANTHROPIC_API_KEY.");
    }
    let knowledge_base = HttpKnowledgeBase::new(config.knowledge_base.clone())
        .context("Failed to create knowledge base client")?;

    Ok(coordinator_with(
        config,
        Arc::new(provider),
        Arc::new(knowledge_base),
        dashboard_host(config)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::dashboard::InMemoryDashboardHost;
    use crate::adapters::knowledge_base::InMemoryKnowledgeBase;
    use crate::adapters::llm::{MockCompletionProvider, MockResponse};
    use crate::services::{prompts, SessionId};

    #[tokio::test]
    async fn test_coordinator_with_in_memory_adapters() {
        let config = Config::default();
        let mock = Arc::new(MockCompletionProvider::new());
        mock.on_system_prompt(
            prompts::TURN_ROUTER_ROLE,
            MockResponse::success(r#"{"intent": "insight"}"#),
        )
        .await;
        let coordinator = coordinator_with(
            &config,
            mock,
            Arc::new(InMemoryKnowledgeBase::answering("Accessories lead.", Some("SELECT 1"))),
            Arc::new(InMemoryDashboardHost::new()),
        );

        let reply = coordinator
            .handle_turn(&SessionId::from("cli"), "Revenue by category?")
            .await;

        assert!(reply.as_text().contains("Accessories lead."));
    }

    #[test]
    fn test_coordinator_requires_api_key() {
        let mut config = Config::default();
        config.llm.api_key = None;
        let result = temp_env::with_var_unset("ANTHROPIC_API_KEY", || coordinator(&config));
        assert!(result.is_err());
    }
}
