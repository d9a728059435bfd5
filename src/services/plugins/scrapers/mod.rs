//! Scraper Kinds
//!
//! A definition file names a scraper *kind*; the kind's factory validates the
//! kind-specific parameters and builds an in-process [`ScraperPlugin`].
//!
//! - `markdown` - fetch a page as markdown and extract events with regex rules
//! - `fixed` - a static list of events

pub mod fixed;
pub mod markdown;

use std::collections::BTreeMap;
use std::sync::Arc;

use eventfinder_core::{PluginContext, ScraperPlugin};

use crate::services::plugins::definition::{DefinitionError, PluginDefinition};

pub use fixed::{FixedScraper, FixedScraperFactory};
pub use markdown::{MarkdownScraper, MarkdownScraperFactory};

/// Metadata every scraper kind carries, taken from the definition.
#[derive(Debug, Clone)]
pub struct ScraperMeta {
    pub name: String,
    pub source_url: String,
    pub description: String,
    pub tags: Vec<String>,
}

impl From<&PluginDefinition> for ScraperMeta {
    fn from(definition: &PluginDefinition) -> Self {
        Self {
            name: definition.name.clone(),
            source_url: definition.source_url.clone(),
            description: definition.description.clone(),
            tags: definition.tags.clone(),
        }
    }
}

/// Builds plugins of one kind.
pub trait ScraperFactory: Send + Sync {
    /// The `[scraper] kind` value this factory handles
    fn kind(&self) -> &'static str;

    /// Validate the definition's parameters and build the plugin.
    fn build(
        &self,
        definition: &PluginDefinition,
        context: &PluginContext,
    ) -> Result<Arc<dyn ScraperPlugin>, DefinitionError>;
}

/// Table of known scraper kinds.
#[derive(Clone, Default)]
pub struct ScraperFactories {
    factories: BTreeMap<&'static str, Arc<dyn ScraperFactory>>,
}

impl ScraperFactories {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in `markdown` and `fixed` kinds
    pub fn with_defaults() -> Self {
        let mut factories = Self::new();
        factories.register(Arc::new(MarkdownScraperFactory));
        factories.register(Arc::new(FixedScraperFactory));
        factories
    }

    /// Add or replace the factory for its kind.
    pub fn register(&mut self, factory: Arc<dyn ScraperFactory>) {
        self.factories.insert(factory.kind(), factory);
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Resolve the definition's kind and build the plugin.
    pub fn build(
        &self,
        definition: &PluginDefinition,
        context: &PluginContext,
    ) -> Result<Arc<dyn ScraperPlugin>, DefinitionError> {
        let kind = definition.scraper.kind.trim();
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| DefinitionError::UnknownKind(kind.to_string()))?;
        factory.build(definition, context)
    }
}

impl std::fmt::Debug for ScraperFactories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScraperFactories")
            .field("kinds", &self.kinds())
            .finish()
    }
}
