//! Markdown Scraper
//!
//! Fetches a listing page through the [`PageFetcher`] capability and extracts
//! events from its markdown with regex rules taken from the definition:
//!
//! - `event_pattern` finds event links; it must capture `title` and `url`
//! - the `lookahead` lines after a match (up to the next event) are searched
//!   for a date, a time, a location and a description
//! - `date_header_pattern` marks lines that set the date for the events
//!   listed below them (calendar-style pages)
//!
//! Year-less dates are placed in the current year and rolled over to the next
//! year when they are already in the past. Events whose date cannot be parsed
//! are dropped.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::format::{Item, StrftimeItems};
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Deserialize;

use eventfinder_core::{Event, EventDraft, PluginContext, ScrapeResult, ScraperPlugin};

use super::{ScraperFactory, ScraperMeta};
use crate::services::plugins::definition::{
    validate_source_url, DefinitionError, PluginDefinition,
};

/// Lines after an event link searched for details
const DEFAULT_LOOKAHEAD: usize = 4;

const DEFAULT_DATE_PATTERN: &str = r"(?i)\b(?P<date>(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(?:st|nd|rd|th)?(?:,?\s+\d{4})?)\b";

const DEFAULT_TIME_PATTERN: &str = r"(?i)\b(?P<time>\d{1,2}:\d{2}\s*(?:[ap]\.?m\.?)?)";

const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%b %d",
    "%b %d, %Y",
    "%b %d %Y",
    "%Y-%m-%d",
    "%m/%d/%Y",
];

/// Parameters of the `markdown` kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkdownConfig {
    /// Page to fetch; defaults to the plugin's `source_url`
    #[serde(default)]
    pub page_url: Option<String>,
    pub event_pattern: String,
    #[serde(default = "default_lookahead")]
    pub lookahead: usize,
    /// Defaults to a month-name pattern unless `date_header_pattern` is set
    #[serde(default)]
    pub date_pattern: Option<String>,
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
    #[serde(default)]
    pub date_header_pattern: Option<String>,
    #[serde(default)]
    pub time_pattern: Option<String>,
    #[serde(default)]
    pub location_pattern: Option<String>,
    #[serde(default)]
    pub description_pattern: Option<String>,
    #[serde(default)]
    pub max_events: Option<usize>,
}

fn default_lookahead() -> usize {
    DEFAULT_LOOKAHEAD
}

fn default_date_formats() -> Vec<String> {
    DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect()
}

/// Compiled extraction rules.
#[derive(Debug, Clone)]
pub struct MarkdownRules {
    base_url: url::Url,
    event: Regex,
    lookahead: usize,
    date: Option<Regex>,
    date_formats: Vec<String>,
    date_header: Option<Regex>,
    time: Regex,
    location: Option<Regex>,
    description: Option<Regex>,
    max_events: Option<usize>,
}

impl MarkdownRules {
    /// Compile and check the rules of a `markdown` definition.
    pub fn compile(config: &MarkdownConfig, page_url: &str) -> Result<Self, DefinitionError> {
        let base_url = validate_source_url(page_url)?;

        let event = compile_pattern("event_pattern", &config.event_pattern)?;
        for group in ["title", "url"] {
            if !event.capture_names().flatten().any(|name| name == group) {
                return Err(DefinitionError::invalid(format!(
                    "event_pattern must have a named group '{}'",
                    group
                )));
            }
        }

        let date_header = config
            .date_header_pattern
            .as_deref()
            .map(|p| compile_pattern("date_header_pattern", p))
            .transpose()?;

        let date = match (&config.date_pattern, &date_header) {
            (Some(p), _) => Some(compile_pattern("date_pattern", p)?),
            (None, Some(_)) => None,
            (None, None) => Some(compile_pattern("date_pattern", DEFAULT_DATE_PATTERN)?),
        };

        if config.date_formats.is_empty() {
            return Err(DefinitionError::invalid("date_formats must not be empty"));
        }
        for format in &config.date_formats {
            validate_date_format(format)?;
        }

        let time = compile_pattern(
            "time_pattern",
            config.time_pattern.as_deref().unwrap_or(DEFAULT_TIME_PATTERN),
        )?;
        let location = config
            .location_pattern
            .as_deref()
            .map(|p| compile_pattern("location_pattern", p))
            .transpose()?;
        let description = config
            .description_pattern
            .as_deref()
            .map(|p| compile_pattern("description_pattern", p))
            .transpose()?;

        if config.max_events == Some(0) {
            return Err(DefinitionError::invalid("max_events must be at least 1"));
        }

        Ok(Self {
            base_url,
            event,
            lookahead: config.lookahead,
            date,
            date_formats: config.date_formats.clone(),
            date_header,
            time,
            location,
            description,
            max_events: config.max_events,
        })
    }

    /// Extract event drafts from a markdown document.
    pub fn extract(&self, markdown: &str, today: NaiveDate) -> Vec<EventDraft> {
        let lines: Vec<&str> = markdown.lines().collect();
        let event_lines: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| self.event.is_match(line))
            .map(|(i, _)| i)
            .collect();

        let mut drafts = Vec::new();
        let mut seen_urls = HashSet::new();
        let mut header_date: Option<NaiveDateTime> = None;

        for (i, line) in lines.iter().enumerate() {
            if let Some(header) = &self.date_header {
                if let Some(value) = first_capture(header, line.trim(), "date") {
                    if let Some(date) = parse_event_date(value, &self.date_formats, today) {
                        header_date = Some(date);
                    }
                }
            }

            if event_lines.binary_search(&i).is_err() {
                continue;
            }

            let next_event = event_lines
                .iter()
                .copied()
                .find(|&j| j > i)
                .unwrap_or(lines.len());
            let end = (i + 1 + self.lookahead).min(next_event);

            for caps in self.event.captures_iter(line) {
                let (Some(title), Some(raw_url), Some(whole)) =
                    (caps.name("title"), caps.name("url"), caps.get(0))
                else {
                    continue;
                };

                let title = clean_title(title.as_str());
                if title.is_empty() {
                    continue;
                }
                let url = match self.base_url.join(raw_url.as_str().trim()) {
                    Ok(url) => url.to_string(),
                    Err(e) => {
                        tracing::debug!("[plugins] Skipping '{}': bad link: {}", title, e);
                        continue;
                    }
                };
                if !seen_urls.insert(url.clone()) {
                    continue;
                }

                let mut context = line[whole.end()..].to_string();
                for detail in &lines[i + 1..end] {
                    context.push('\n');
                    context.push_str(detail);
                }

                let date = self
                    .date
                    .as_ref()
                    .and_then(|re| {
                        re.captures_iter(&context).find_map(|c| {
                            let value = c.name("date").or_else(|| c.get(1)).or_else(|| c.get(0))?;
                            parse_event_date(value.as_str(), &self.date_formats, today)
                        })
                    })
                    .or(header_date);

                let Some(date) = date else {
                    tracing::debug!("[plugins] Dropping '{}': no parseable date", title);
                    continue;
                };

                let mut draft = EventDraft::new(title, url);
                draft.date = Some(date);
                draft.time = first_capture(&self.time, &context, "time").map(str::to_string);
                draft.location = self
                    .location
                    .as_ref()
                    .and_then(|re| first_capture(re, &context, "location"))
                    .map(str::to_string);
                draft.description = self
                    .description
                    .as_ref()
                    .and_then(|re| first_capture(re, &context, "description"))
                    .map(str::to_string);
                drafts.push(draft);

                if self.max_events.is_some_and(|max| drafts.len() >= max) {
                    return drafts;
                }
            }
        }

        drafts
    }
}

fn compile_pattern(field: &str, pattern: &str) -> Result<Regex, DefinitionError> {
    Regex::new(pattern)
        .map_err(|e| DefinitionError::invalid(format!("{} does not compile: {}", field, e)))
}

/// Reject strftime strings chrono cannot interpret.
fn validate_date_format(format: &str) -> Result<(), DefinitionError> {
    if format.trim().is_empty() {
        return Err(DefinitionError::invalid("date format must not be empty"));
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(DefinitionError::invalid(format!(
            "'{}' is not a valid date format",
            format
        )));
    }
    Ok(())
}

/// Named group, else group 1, else the whole match; trimmed and non-empty.
fn first_capture<'t>(re: &Regex, text: &'t str, group: &str) -> Option<&'t str> {
    let caps = re.captures(text)?;
    caps.name(group)
        .or_else(|| caps.get(1))
        .or_else(|| caps.get(0))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

fn clean_title(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c == '*' || c == '_' || c == '#' || c.is_whitespace())
        .to_string()
}

/// Collapse whitespace, drop ordinal suffixes and stray punctuation.
fn normalize_date_text(raw: &str) -> String {
    raw.split_whitespace()
        .map(|token| {
            let token = token.trim_end_matches('.');
            let lower = token.to_lowercase();
            if lower == "sept" {
                return "Sep".to_string();
            }
            let (body, comma) = match token.strip_suffix(',') {
                Some(body) => (body, ","),
                None => (token, ""),
            };
            for suffix in ["st", "nd", "rd", "th"] {
                if let Some(digits) = body.strip_suffix(suffix) {
                    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                        return format!("{}{}", digits, comma);
                    }
                }
            }
            token.to_string()
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == ',' || c == '|' || c == '·')
        .trim()
        .to_string()
}

fn format_has_year(format: &str) -> bool {
    format.contains("%Y") || format.contains("%y") || format.contains("%G")
}

fn parse_with_format(value: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a date string with the first matching format.
///
/// Formats without a year use `today`'s year and roll forward a year when
/// the result is already in the past.
pub fn parse_event_date(raw: &str, formats: &[String], today: NaiveDate) -> Option<NaiveDateTime> {
    let value = normalize_date_text(raw);
    if value.is_empty() {
        return None;
    }

    for format in formats {
        if format_has_year(format) {
            if let Some(parsed) = parse_with_format(&value, format) {
                return Some(parsed);
            }
            continue;
        }

        let with_year = format!("{} {}", value, today.year());
        let format_with_year = format!("{} %Y", format);
        if let Some(parsed) = parse_with_format(&with_year, &format_with_year) {
            if parsed.date() < today {
                let next_year = format!("{} {}", value, today.year() + 1);
                return parse_with_format(&next_year, &format_with_year).or(Some(parsed));
            }
            return Some(parsed);
        }
    }

    None
}

/// `markdown` kind plugin.
pub struct MarkdownScraper {
    meta: ScraperMeta,
    page_url: String,
    rules: MarkdownRules,
    context: PluginContext,
}

impl MarkdownScraper {
    pub fn new(meta: ScraperMeta, page_url: String, rules: MarkdownRules, context: PluginContext) -> Self {
        Self {
            meta,
            page_url,
            rules,
            context,
        }
    }

    /// Extract finished events from a fetched page.
    pub fn extract(&self, markdown: &str, today: NaiveDate) -> Vec<Event> {
        self.rules
            .extract(markdown, today)
            .into_iter()
            .filter_map(|mut draft| {
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
impl ScraperPlugin for MarkdownScraper {
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
        let fetcher = self.context.fetcher()?;

        let markdown = match fetcher.fetch(&self.page_url).await {
            Ok(markdown) => markdown,
            Err(e) => {
                tracing::warn!(
                    "[plugins] {}: could not fetch {}: {}",
                    self.meta.name,
                    self.page_url,
                    e
                );
                return Ok(vec![]);
            }
        };

        let events = self.extract(&markdown, Local::now().date_naive());
        if events.is_empty() {
            tracing::warn!(
                "[plugins] {}: no events matched on {} (page layout may have changed)",
                self.meta.name,
                self.page_url
            );
        } else {
            tracing::info!("[plugins] {}: scraped {} events", self.meta.name, events.len());
        }
        Ok(events)
    }
}

/// Factory for the `markdown` kind.
pub struct MarkdownScraperFactory;

impl ScraperFactory for MarkdownScraperFactory {
    fn kind(&self) -> &'static str {
        "markdown"
    }

    fn build(
        &self,
        definition: &PluginDefinition,
        context: &PluginContext,
    ) -> Result<Arc<dyn ScraperPlugin>, DefinitionError> {
        let config: MarkdownConfig = definition.scraper.params_as()?;
        let page_url = config
            .page_url
            .clone()
            .unwrap_or_else(|| definition.source_url.clone());
        let rules = MarkdownRules::compile(&config, &page_url)?;
        Ok(Arc::new(MarkdownScraper::new(
            ScraperMeta::from(definition),
            page_url,
            rules,
            context.clone(),
        )))
    }
}
