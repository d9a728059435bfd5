//! Scraper Plugin Contract
//!
//! The minimum capability set every event source must expose. A plugin owns
//! all source-specific knowledge (where to look, how to parse) and hands back
//! normalized [`Event`]s.
//!
//! ## Failure contract
//!
//! - Ordinary conditions (site down, layout changed, nothing listed) are NOT
//!   errors: `scrape` logs the cause and returns `Ok(vec![])`.
//! - Unrecoverable conditions (a required capability is missing, the plugin
//!   is misconfigured beyond repair) return `Err(PluginFailure)`. Callers
//!   isolate the failure to that single plugin.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::event::Event;
use crate::fetch::PageFetcher;

/// Fatal, per-plugin failure signalled from `scrape`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PluginFailure {
    /// A capability the plugin depends on was not provided
    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// Any other condition the plugin cannot recover from
    #[error("Plugin failure: {0}")]
    Fatal(String),
}

impl PluginFailure {
    /// Create a fatal failure
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }
}

/// Result of one `scrape` invocation
pub type ScrapeResult = Result<Vec<Event>, PluginFailure>;

/// Capability interface implemented by every event source.
#[async_trait]
pub trait ScraperPlugin: Send + Sync {
    /// Unique plugin name; also the `source` of every event it produces.
    fn name(&self) -> &str;

    /// Origin site the plugin targets.
    fn source_url(&self) -> &str;

    /// Human-readable summary.
    fn description(&self) -> &str;

    /// Retrieve and normalize the source's current events.
    async fn scrape(&self) -> ScrapeResult;
}

/// Helpers handed to plugins when they are instantiated.
///
/// Plugins are free to ignore them.
#[derive(Clone, Default)]
pub struct PluginContext {
    fetcher: Option<Arc<dyn PageFetcher>>,
}

impl PluginContext {
    /// Context exposing the given page fetcher.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher: Some(fetcher),
        }
    }

    /// Context without any capabilities.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The page fetcher, or a `CapabilityUnavailable` failure.
    pub fn fetcher(&self) -> Result<Arc<dyn PageFetcher>, PluginFailure> {
        self.fetcher
            .clone()
            .ok_or_else(|| PluginFailure::CapabilityUnavailable("page fetcher".to_string()))
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("fetcher", &self.fetcher.is_some())
            .finish()
    }
}
