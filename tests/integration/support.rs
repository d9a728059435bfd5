//! Shared fakes for the integration tests.
//!
//! - `ScriptedProvider` - generation capability answering from a closure
//! - `MapFetcher` - page fetcher backed by a URL -> markdown map
//! - `ScriptedPlugin` - scraper that returns, fails, hangs or panics on demand

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use eventfinder::services::plugins::{PluginDescriptor, PluginRegistry};
use eventfinder::{AppConfig, AppState};
use eventfinder_core::{
    Event, EventDraft, FetchError, FetchResult, PageFetcher, PluginFailure, ScrapeResult,
    ScraperPlugin,
};
use eventfinder_llm::{
    LlmError, LlmProvider, LlmRequestOptions, LlmResponse, LlmResult, Message,
};

// ============================================================================
// Generation capability
// ============================================================================

type Reply = Box<dyn Fn(&str, &[Message]) -> LlmResult<String> + Send + Sync>;

/// One recorded provider call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub messages: Vec<Message>,
}

pub struct ScriptedProvider {
    reply: Reply,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    /// Answer every call from `reply(system, messages)`.
    pub fn with<F>(reply: F) -> Arc<Self>
    where
        F: Fn(&str, &[Message]) -> LlmResult<String> + Send + Sync + 'static,
    {
        Arc::new(Self {
            reply: Box::new(reply),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        let text = text.to_string();
        Self::with(move |_, _| Ok(text.clone()))
    }

    pub fn failing() -> Arc<Self> {
        Self::with(|_, _| Err(LlmError::Network("connection refused".to_string())))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        _request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let system = system.unwrap_or_default();
        let text = (self.reply)(&system, &messages);
        self.calls
            .lock()
            .unwrap()
            .push(RecordedCall { system, messages });

        Ok(LlmResponse::text(self.model(), text?))
    }
}

/// Whether a recorded system prompt is the ranking prompt.
pub fn is_ranking_prompt(system: &str) -> bool {
    system.contains("\"picks\"")
}

/// Whether a recorded system prompt is the plugin drafting prompt.
pub fn is_drafting_prompt(system: &str) -> bool {
    system.contains("[scraper]")
}

// ============================================================================
// Fetch capability
// ============================================================================

/// Serves pages from a map. With a delay set, each fetch holds for that long
/// and the highest number of overlapping fetches is recorded.
#[derive(Default)]
pub struct MapFetcher {
    pages: HashMap<String, String>,
    calls: AtomicUsize,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MapFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_pages(pages: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self::from_pages(pages, None))
    }

    /// Like `with_pages`, but every fetch takes `delay`.
    pub fn slow(pages: &[(&str, &str)], delay: Duration) -> Arc<Self> {
        Arc::new(Self::from_pages(pages, Some(delay)))
    }

    fn from_pages(pages: &[(&str, &str)], delay: Option<Duration>) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, page)| (url.to_string(), page.to_string()))
                .collect(),
            delay,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most fetches that were running at the same moment.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Network(format!("no route to {}", url)))
    }
}

// ============================================================================
// Plugins
// ============================================================================

#[derive(Clone)]
pub enum Behavior {
    Events(Vec<Event>),
    Fail(String),
    Hang,
    Panic,
    /// Register `plugin` into `registry` mid-scrape, then return `events`
    RegisterDuring {
        registry: Arc<PluginRegistry>,
        plugin: Arc<PluginDescriptor>,
        events: Vec<Event>,
    },
}

pub struct ScriptedPlugin {
    name: String,
    behavior: Behavior,
    scrapes: Arc<AtomicUsize>,
}

impl ScriptedPlugin {
    pub fn new(name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            scrapes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of `scrape` calls.
    pub fn scrape_counter(&self) -> Arc<AtomicUsize> {
        self.scrapes.clone()
    }

    pub fn into_descriptor(self) -> Arc<PluginDescriptor> {
        Arc::new(PluginDescriptor::from_instance(Arc::new(self)))
    }
}

#[async_trait]
impl ScraperPlugin for ScriptedPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_url(&self) -> &str {
        "https://scripted.example.com"
    }

    fn description(&self) -> &str {
        "Scripted test source"
    }

    async fn scrape(&self) -> ScrapeResult {
        self.scrapes.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Events(events) => Ok(events.clone()),
            Behavior::Fail(reason) => Err(PluginFailure::fatal(reason.clone())),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(vec![])
            }
            Behavior::Panic => panic!("scraper exploded"),
            Behavior::RegisterDuring {
                registry,
                plugin,
                events,
            } => {
                registry.upsert(plugin.clone()).await;
                Ok(events.clone())
            }
        }
    }
}

/// A finished event dated `date` (`YYYY-MM-DD`).
pub fn event(title: &str, url: &str, date: &str, source: &str) -> Event {
    let mut draft = EventDraft::new(title, url);
    draft.date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0));
    draft.finish(source).expect("test event must be complete")
}

// ============================================================================
// Files and state
// ============================================================================

pub fn write_definition(dir: &Path, file_name: &str, text: &str) {
    std::fs::write(dir.join(file_name), text).unwrap();
}

/// A `fixed` definition with one event in 2099.
pub fn fixed_definition(name: &str, source_url: &str) -> String {
    format!(
        r#"name = "{name}"
source_url = "{source_url}"
description = "Fixed events for {name}"

[scraper]
kind = "fixed"

[[scraper.events]]
title = "{name} Night"
url = "{source_url}/night"
date = "2099-06-01T18:00:00"
"#
    )
}

/// Application state around fakes, rooted at `plugins_dir`.
pub fn app_state(
    plugins_dir: &Path,
    fetcher: Arc<MapFetcher>,
    provider: Arc<ScriptedProvider>,
) -> Arc<AppState> {
    Arc::new(
        AppState::with_capabilities(
            AppConfig::default(),
            plugins_dir.to_path_buf(),
            fetcher,
            provider,
        )
        .unwrap(),
    )
}
