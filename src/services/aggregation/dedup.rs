//! Event deduplication
//!
//! Two events are the same occurrence when their trimmed URLs match. Events
//! without a URL fall back to `(title, date, source)`. The first one seen wins.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use eventfinder_core::Event;

#[derive(Debug, Hash, PartialEq, Eq)]
enum DedupKey {
    Url(String),
    Fallback(String, NaiveDateTime, String),
}

fn key(event: &Event) -> DedupKey {
    let url = event.url.trim();
    if url.is_empty() {
        DedupKey::Fallback(event.title.trim().to_string(), event.date, event.source.clone())
    } else {
        DedupKey::Url(url.to_string())
    }
}

/// Drop repeated occurrences, keeping input order.
pub fn dedup_events(events: Vec<Event>) -> Vec<Event> {
    let before = events.len();
    let mut seen = HashSet::new();
    let kept: Vec<Event> = events.into_iter().filter(|e| seen.insert(key(e))).collect();

    if kept.len() < before {
        tracing::debug!("[aggregation] Dropped {} duplicate events", before - kept.len());
    }
    kept
}
