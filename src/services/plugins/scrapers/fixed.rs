//! Fixed Scraper
//!
//! Serves a static list of events declared in the definition. Useful for
//! demo sources and one-off events that are not listed anywhere scrapable.
//! An event may give an absolute `date` or `starts_in_seconds`, which is
//! resolved against the clock at scrape time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use eventfinder_core::{Event, EventDraft, PluginContext, ScrapeResult, ScraperPlugin};

use super::{ScraperFactory, ScraperMeta};
use crate::services::plugins::definition::{DefinitionError, PluginDefinition};

/// Parameters of the `fixed` kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixedConfig {
    pub events: Vec<FixedEvent>,
}

/// One declared event.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixedEvent {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub starts_in_seconds: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
enum When {
    At(NaiveDateTime),
    In(Duration),
}

/// Parse `2026-01-26T10:00:00`, `2026-01-26 10:00` or `2026-01-26`.
fn parse_fixed_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

impl FixedEvent {
    fn when(&self) -> Result<When, DefinitionError> {
        match (&self.date, self.starts_in_seconds) {
            (Some(date), None) => parse_fixed_date(date).map(When::At).ok_or_else(|| {
                DefinitionError::invalid(format!(
                    "event '{}' has unparseable date '{}'",
                    self.title, date
                ))
            }),
            (None, Some(seconds)) => Duration::try_seconds(seconds).map(When::In).ok_or_else(|| {
                DefinitionError::invalid(format!(
                    "event '{}' has out-of-range starts_in_seconds {}",
                    self.title, seconds
                ))
            }),
            (Some(_), Some(_)) => Err(DefinitionError::invalid(format!(
                "event '{}' sets both date and starts_in_seconds",
                self.title
            ))),
            (None, None) => Err(DefinitionError::invalid(format!(
                "event '{}' needs a date or starts_in_seconds",
                self.title
            ))),
        }
    }
}

#[derive(Debug, Clone)]
struct ResolvedEvent {
    spec: FixedEvent,
    when: When,
}

/// `fixed` kind plugin.
pub struct FixedScraper {
    meta: ScraperMeta,
    events: Vec<ResolvedEvent>,
}

impl FixedScraper {
    /// Validate the declared events.
    pub fn new(meta: ScraperMeta, config: FixedConfig) -> Result<Self, DefinitionError> {
        if config.events.is_empty() {
            return Err(DefinitionError::invalid("fixed scraper declares no events"));
        }

        let mut events = Vec::with_capacity(config.events.len());
        for spec in config.events {
            if spec.title.trim().is_empty() {
                return Err(DefinitionError::invalid("fixed event title must not be empty"));
            }
            if spec.url.trim().is_empty() {
                return Err(DefinitionError::invalid(format!(
                    "event '{}' has no url",
                    spec.title
                )));
            }
            let when = spec.when()?;
            events.push(ResolvedEvent { spec, when });
        }

        Ok(Self { meta, events })
    }

    /// Materialize the events relative to `now`.
    ///
    /// An offset that overflows the calendar drops its event.
    pub fn events_at(&self, now: NaiveDateTime) -> Vec<Event> {
        self.events
            .iter()
            .filter_map(|resolved| {
                let spec = &resolved.spec;
                let date = match resolved.when {
                    When::At(date) => date,
                    When::In(offset) => match now.checked_add_signed(offset) {
                        Some(date) => date,
                        None => {
                            tracing::warn!(
                                "[plugins] {}: '{}' starts beyond the supported date range",
                                self.meta.name,
                                spec.title
                            );
                            return None;
                        }
                    },
                };
                let mut draft = EventDraft::new(spec.title.clone(), spec.url.clone());
                draft.date = Some(date);
                draft.description = spec.description.clone();
                draft.time = spec.time.clone();
                draft.location = spec.location.clone();
                draft.tags = spec.tags.clone();
                for tag in &self.meta.tags {
                    if !draft.tags.contains(tag) {
                        draft.tags.push(tag.clone());
                    }
                }
                draft.finish(&self.meta.name)
            })
            .collect()
    }
}

#[async_trait]
impl ScraperPlugin for FixedScraper {
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn source_url(&self) -> &str {
        &self.meta.source_url
    }

    fn description(&self) -> &str {
        &self.meta.description
    }

    async fn scrape(&self) -> ScrapeResult {
        Ok(self.events_at(Local::now().naive_local()))
    }
}

/// Factory for the `fixed` kind.
pub struct FixedScraperFactory;

impl ScraperFactory for FixedScraperFactory {
    fn kind(&self) -> &'static str {
        "fixed"
    }

    fn build(
        &self,
        definition: &PluginDefinition,
        _context: &PluginContext,
    ) -> Result<Arc<dyn ScraperPlugin>, DefinitionError> {
        let config: FixedConfig = definition.scraper.params_as()?;
        Ok(Arc::new(FixedScraper::new(ScraperMeta::from(definition), config)?))
    }
}
