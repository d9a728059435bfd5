//! Event Record
//!
//! The normalized unit every scraper plugin produces. Sources differ wildly in
//! how they present events, so only `title`, `date`, `url` and `source` are
//! mandatory; everything else is best-effort.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single discoverable occurrence reported by one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Identifier, stable within a scrape cycle and unique per source
    pub id: String,
    /// Event title (non-empty)
    pub title: String,
    /// Optional long-form description
    #[serde(default)]
    pub description: Option<String>,
    /// When the event happens. Date-only events are stored at midnight.
    pub date: NaiveDateTime,
    /// Free-form time string as shown by the source ("6:30 PM PST")
    #[serde(default)]
    pub time: Option<String>,
    /// Venue or area
    #[serde(default)]
    pub location: Option<String>,
    /// Canonical link to the event
    pub url: String,
    /// Name of the plugin that produced this event
    pub source: String,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Event {
    /// Derive a stable id from the fields that identify an occurrence.
    ///
    /// Uses the first 16 hex characters of a SHA-256 digest so ids survive
    /// across scrape cycles as long as the source keeps reporting the same data.
    pub fn derive_id(source: &str, url: &str, title: &str, date: &NaiveDateTime) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update([0u8]);
        hasher.update(url.as_bytes());
        hasher.update([0u8]);
        hasher.update(title.as_bytes());
        hasher.update([0u8]);
        hasher.update(date.format("%Y-%m-%dT%H:%M:%S").to_string().as_bytes());
        hasher
            .finalize()
            .iter()
            .take(8)
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    /// Whether the url can serve as the dedup key.
    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Partially-parsed event, before it is attributed to a source.
///
/// Scraper implementations fill this in while parsing and call
/// [`EventDraft::finish`] once the owning plugin's name is known.
#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    pub title: String,
    pub url: String,
    pub date: Option<NaiveDateTime>,
    pub description: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub tags: Vec<String>,
}

impl EventDraft {
    /// Create a draft with the two fields every source provides.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Turn the draft into an [`Event`] owned by `source`.
    ///
    /// Returns `None` when the draft is missing its title or date; such
    /// events are rejected by the producing plugin rather than the engine.
    pub fn finish(self, source: &str) -> Option<Event> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return None;
        }
        let date = self.date?;
        let url = self.url.trim().to_string();
        Some(Event {
            id: Event::derive_id(source, &url, &title, &date),
            title,
            description: non_empty(self.description),
            date,
            time: non_empty(self.time),
            location: non_empty(self.location),
            url,
            source: source.to_string(),
            tags: self.tags,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
