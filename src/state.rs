//! Application State
//!
//! Wires the services together. Shared by every HTTP handler behind an `Arc`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eventfinder_core::{PageFetcher, PluginContext};
use eventfinder_llm::{create_provider, LlmProvider, ProviderConfig};
use eventfinder_tools::{WebFetchOptions, WebFetchService};

use crate::models::settings::AppConfig;
use crate::services::aggregation::{AggregationEngine, AggregationOptions};
use crate::services::chat::{ChatOrchestrator, IntentClassifier};
use crate::services::plugins::{
    GeneratorOptions, PluginGenerator, PluginLoader, PluginRegistry, ScraperFactories,
};
use crate::utils::error::AppResult;

/// Everything a request handler needs.
pub struct AppState {
    config: AppConfig,
    registry: Arc<PluginRegistry>,
    loader: Arc<PluginLoader>,
    orchestrator: ChatOrchestrator,
}

impl AppState {
    /// Build the production state: web fetcher and the configured provider.
    pub fn build(
        config: AppConfig,
        plugins_dir: PathBuf,
        provider_config: ProviderConfig,
    ) -> AppResult<Self> {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(WebFetchService::new(WebFetchOptions {
            timeout_secs: config.fetch_timeout_secs,
            cache_ttl_secs: config.fetch_cache_ttl_secs,
            ..Default::default()
        }));
        let provider = create_provider(provider_config);

        Self::with_capabilities(config, plugins_dir, fetcher, provider)
    }

    /// Build the state around explicit fetch and generation capabilities.
    pub fn with_capabilities(
        config: AppConfig,
        plugins_dir: PathBuf,
        fetcher: Arc<dyn PageFetcher>,
        provider: Arc<dyn LlmProvider>,
    ) -> AppResult<Self> {
        let classifier = IntentClassifier::from_config(&config.intent)?;

        let registry = Arc::new(PluginRegistry::new());
        let loader = Arc::new(PluginLoader::new(
            plugins_dir,
            registry.clone(),
            Arc::new(ScraperFactories::with_defaults()),
            PluginContext::new(fetcher.clone()),
        ));

        let engine = Arc::new(AggregationEngine::new(
            registry.clone(),
            provider.clone(),
            AggregationOptions {
                scrape_timeout: Duration::from_secs(config.scrape_timeout_secs),
                max_results: config.max_results,
            },
        ));
        let generator = Arc::new(PluginGenerator::new(
            loader.clone(),
            fetcher,
            provider.clone(),
            GeneratorOptions {
                max_page_chars: config.max_page_chars,
                smoke_test_timeout: Duration::from_secs(config.smoke_test_timeout_secs),
            },
        ));

        tracing::info!(
            "[state] Provider {} ({}), plugin directory {}",
            provider.name(),
            provider.model(),
            loader.dir().display()
        );

        let orchestrator = ChatOrchestrator::new(classifier, engine, generator, provider);

        Ok(Self {
            config,
            registry,
            loader,
            orchestrator,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn loader(&self) -> &Arc<PluginLoader> {
        &self.loader
    }

    pub fn orchestrator(&self) -> &ChatOrchestrator {
        &self.orchestrator
    }
}
