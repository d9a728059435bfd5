//! Prompt Builders
//!
//! System prompts and context formatting for the three generation calls the
//! backend makes: plain chat, event ranking and plugin drafting.

use eventfinder_core::Event;

/// Marker appended to page text cut at the context limit.
pub const TRUNCATION_MARKER: &str = "\n... [truncated]";

/// How many events the ranking prompt asks to be picked.
pub const RANKING_PICKS: usize = 5;

/// System prompt for plain conversation.
pub fn chat_system_prompt() -> String {
    "You are a helpful assistant for EventFinder, an application that helps users discover events.\n\
     You help users find events that match their interests and can provide recommendations based on available event data.\n\
     You can also create new event sources when asked, e.g. \"create a plugin for lu.ma/sf\".\n\
     Be concise, friendly, and helpful in your responses."
        .to_string()
}

/// System prompt for ranking a numbered event list against the user's interest.
pub fn ranking_system_prompt(events: &[Event]) -> String {
    format!(
        r#"You are an AI assistant for EventFinder that helps users discover events matching their interests.

You have access to a numbered list of available events. Your job is to:
1. Understand what the user is looking for based on their message and the conversation so far
2. Pick the events most relevant to their interests (up to {picks} most relevant), best match first
3. Explain briefly why each pick matches

Respond with JSON only, no prose and no code fences, in exactly this shape:
{{"summary": "<short acknowledgment and commentary>", "picks": [{{"index": <event number>, "reason": "<why it matches>"}}]}}

The event cards (title, date, location, link) are displayed separately, so the
summary should focus on why the picks are a good match. If nothing matches
well, pick the closest events and say so in the summary.

{context}"#,
        picks = RANKING_PICKS,
        context = format_events_for_context(events)
    )
}

/// Numbered, human-readable event list.
pub fn format_events_for_context(events: &[Event]) -> String {
    if events.is_empty() {
        return "No events are currently available.".to_string();
    }

    let described: Vec<String> = events
        .iter()
        .enumerate()
        .map(|(i, event)| {
            let mut parts = vec![format!("[{}] **{}**", i, event.title)];
            parts.push(format!("  Date: {}", event.date.format("%Y-%m-%d")));
            if let Some(time) = &event.time {
                parts.push(format!("  Time: {}", time));
            }
            if let Some(location) = &event.location {
                parts.push(format!("  Location: {}", location));
            }
            if let Some(description) = &event.description {
                parts.push(format!("  Description: {}", description));
            }
            parts.push(format!("  Source: {}", event.source));
            parts.push(format!("  URL: {}", event.url));
            if !event.tags.is_empty() {
                parts.push(format!("  Tags: {}", event.tags.join(", ")));
            }
            parts.join("\n")
        })
        .collect();

    format!(
        "Available events ({} total):\n\n{}",
        events.len(),
        described.join("\n\n")
    )
}

/// Inputs of the drafting prompt.
#[derive(Debug, Clone)]
pub struct DraftRequest<'a> {
    pub url: &'a str,
    pub plugin_name: &'a str,
    pub file_name: &'a str,
    pub page: &'a str,
    pub max_page_chars: usize,
}

/// System prompt for drafting a plugin definition.
pub fn generation_system_prompt(request: &DraftRequest<'_>) -> String {
    format!(
        r#"You are generating a scraper plugin definition for EventFinder.

A plugin is a TOML file with this exact structure:

```toml
name = "{name}"
source_url = "{url}"
description = "Scrapes events from <site>"
tags = []

[scraper]
kind = "markdown"
event_pattern = '<regex matching one event line>'
lookahead = 4
date_pattern = '<regex with a named group "date">'
date_formats = ["%b %d", "%B %d", "%b %d, %Y", "%Y-%m-%d"]
time_pattern = '<regex with a named group "time">'
location_pattern = '<regex with a named group "location">'
```

The page is fetched and converted to markdown, then processed line by line:
- every line matching `event_pattern` starts an event; the pattern MUST capture
  named groups `title` and `url` (relative URLs are resolved against the page)
- the next `lookahead` lines are searched with `date_pattern`, `time_pattern`,
  `location_pattern` and `description_pattern` (all optional, each capturing a
  group of the same name)
- if dates appear as section headers instead, set `date_header_pattern` (with a
  `date` group); matching lines set the date for the events that follow
- `date_formats` are chrono strftime formats tried in order on the captured
  date; year-less dates are placed in the next upcoming year
- events without a parseable date are dropped

Each produced event has: title, url, date, and optional time, location,
description and tags. Regexes use Rust `regex` syntax (no lookaround, no
backreferences); write them as TOML literal strings in single quotes.

Generate a plugin for:
- URL: {url}
- Plugin name: {name}
- Plugin file name will be: {file}

Return ONLY the TOML, no explanations and no code fences.

Here is the page structure (markdown format):

{page}
"#,
        name = request.plugin_name,
        url = request.url,
        file = request.file_name,
        page = truncate_page(request.page, request.max_page_chars)
    )
}

/// User message accompanying the drafting prompt.
pub fn generation_user_message(url: &str) -> String {
    format!(
        "Generate a scraper plugin for {}. Analyze the page structure and write extraction rules for its events.",
        url
    )
}

/// Cut `page` to at most `max_chars` characters, marking the cut.
pub fn truncate_page(page: &str, max_chars: usize) -> String {
    match page.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &page[..byte_idx], TRUNCATION_MARKER),
        None => page.to_string(),
    }
}

/// Remove a surrounding markdown code fence (with optional language tag).
pub fn strip_code_fences(text: &str) -> String {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = match rest.find('\n') {
            Some(newline) if !rest[..newline].contains(char::is_whitespace) => &rest[newline + 1..],
            _ => rest,
        };
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }
    body.trim().to_string()
}
