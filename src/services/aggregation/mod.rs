//! Aggregation & Ranking Engine
//!
//! One search cycle:
//! 1. snapshot the registry
//! 2. scrape every plugin concurrently, each in its own task under a timeout
//! 3. concatenate results in snapshot order and deduplicate
//! 4. rank with the generation capability (date order when that fails)
//!
//! A failing, hanging or panicking plugin only costs its own contribution; it
//! is reported as a [`SourceFailure`] and the cycle carries on.

pub mod dedup;
pub mod ranking;

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;

use eventfinder_core::{Event, ScrapeResult};
use eventfinder_llm::{LlmProvider, Message};

use crate::services::plugins::{PluginDescriptor, PluginRegistry};

pub use dedup::dedup_events;
pub use ranking::{EventRanker, RankedEvent, Ranking};

/// Explanation returned when no source produced anything.
pub const NO_EVENTS_MESSAGE: &str = "No matching events found. There are currently no events available from our sources. Please try again later or ask me to create a plugin for a specific event source.";

/// A plugin that contributed nothing to a cycle, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub plugin: String,
    pub reason: String,
}

/// Result of one search cycle.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub explanation: String,
    pub events: Vec<RankedEvent>,
    pub failures: Vec<SourceFailure>,
    pub ranked: bool,
}

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct AggregationOptions {
    pub scrape_timeout: Duration,
    pub max_results: usize,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            scrape_timeout: Duration::from_secs(30),
            max_results: 10,
        }
    }
}

/// Fans a query out to every active plugin and ranks the union.
pub struct AggregationEngine {
    registry: Arc<PluginRegistry>,
    ranker: EventRanker,
    scrape_timeout: Duration,
}

impl AggregationEngine {
    pub fn new(
        registry: Arc<PluginRegistry>,
        provider: Arc<dyn LlmProvider>,
        options: AggregationOptions,
    ) -> Self {
        Self {
            registry,
            ranker: EventRanker::new(provider, options.max_results),
            scrape_timeout: options.scrape_timeout,
        }
    }

    /// Search all sources for `interest`. Never fails.
    pub async fn find(&self, interest: &str, history: &[Message]) -> SearchOutcome {
        let snapshot = self.registry.snapshot().await;
        if snapshot.is_empty() {
            tracing::warn!("[aggregation] No plugins loaded in registry");
            return empty_outcome(Vec::new());
        }

        tracing::info!("[aggregation] Scraping {} sources", snapshot.len());
        let (events, failures) = self.scrape_all(snapshot.into_iter().collect()).await;
        let events = dedup_events(events);

        if events.is_empty() {
            return empty_outcome(failures);
        }

        let ranking = self.ranker.rank(interest, history, events).await;
        tracing::info!(
            "[aggregation] Returning {} events (ranked: {}, failed sources: {})",
            ranking.events.len(),
            ranking.ranked,
            failures.len()
        );
        SearchOutcome {
            explanation: ranking.explanation,
            events: ranking.events,
            failures,
            ranked: ranking.ranked,
        }
    }

    /// Scrape every plugin concurrently; results come back in input order.
    pub async fn scrape_all(
        &self,
        plugins: Vec<Arc<PluginDescriptor>>,
    ) -> (Vec<Event>, Vec<SourceFailure>) {
        let timeout = self.scrape_timeout;
        let handles: Vec<_> = plugins
            .iter()
            .map(|descriptor| {
                let instance = descriptor.instance.clone();
                tokio::spawn(async move { tokio::time::timeout(timeout, instance.scrape()).await })
            })
            .collect();

        let outputs = join_all(handles).await;

        let mut events = Vec::new();
        let mut failures = Vec::new();
        for (descriptor, output) in plugins.iter().zip(outputs) {
            let name = descriptor.name.as_str();
            match collect(name, output, timeout) {
                Ok(batch) => {
                    tracing::info!("[aggregation] Scraped {} events from {}", batch.len(), name);
                    events.extend(batch);
                }
                Err(failure) => {
                    tracing::warn!("[aggregation] {} failed: {}", failure.plugin, failure.reason);
                    failures.push(failure);
                }
            }
        }
        (events, failures)
    }
}

type TaskOutput = Result<Result<ScrapeResult, tokio::time::error::Elapsed>, tokio::task::JoinError>;

/// Turn one task's output into stamped events or a failure entry.
fn collect(plugin: &str, output: TaskOutput, timeout: Duration) -> Result<Vec<Event>, SourceFailure> {
    let failure = |reason: String| SourceFailure {
        plugin: plugin.to_string(),
        reason,
    };

    let events = match output {
        Ok(Ok(Ok(events))) => events,
        Ok(Ok(Err(plugin_failure))) => return Err(failure(plugin_failure.to_string())),
        Ok(Err(_)) => return Err(failure(format!("timed out after {}s", timeout.as_secs()))),
        Err(join_error) if join_error.is_panic() => return Err(failure("plugin panicked".to_string())),
        Err(join_error) => return Err(failure(join_error.to_string())),
    };

    Ok(events
        .into_iter()
        .filter(|event| {
            let keep = !event.title.trim().is_empty();
            if !keep {
                tracing::debug!("[aggregation] Dropping untitled event from {}", plugin);
            }
            keep
        })
        .map(|mut event| {
            if event.source != plugin {
                tracing::debug!(
                    "[aggregation] {} reported source '{}', restamping",
                    plugin,
                    event.source
                );
                event.source = plugin.to_string();
            }
            event
        })
        .collect())
}

fn empty_outcome(failures: Vec<SourceFailure>) -> SearchOutcome {
    SearchOutcome {
        explanation: NO_EVENTS_MESSAGE.to_string(),
        events: Vec::new(),
        failures,
        ranked: false,
    }
}
