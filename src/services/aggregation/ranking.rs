//! Ranking
//!
//! Asks the generation capability to pick and explain the events that match
//! the user's interest. The reply is untrusted: it must be JSON of the shape
//! `{"summary": ..., "picks": [{"index": n, "reason": ...}]}`, and picks that
//! point outside the list or repeat an earlier pick are ignored. When the
//! reply is unusable the events are returned in date order instead.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use eventfinder_core::Event;
use eventfinder_llm::{LlmProvider, LlmRequestOptions, Message};

use crate::services::prompts;

/// An event in a result set, with the ranker's reason when there is one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEvent {
    #[serde(flatten)]
    pub event: Event,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RankedEvent {
    pub fn unranked(event: Event) -> Self {
        Self {
            event,
            reason: None,
        }
    }
}

/// Ordered result set with its explanation.
#[derive(Debug, Clone)]
pub struct Ranking {
    pub explanation: String,
    pub events: Vec<RankedEvent>,
    /// Whether the order came from the ranker (false for the date-order fallback)
    pub ranked: bool,
}

#[derive(Debug, Deserialize)]
struct RankingReply {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    picks: Vec<Pick>,
}

#[derive(Debug, Deserialize)]
struct Pick {
    index: usize,
    #[serde(default)]
    reason: Option<String>,
}

/// Validated picks: `(index, reason)` in ranker order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRanking {
    pub summary: String,
    pub picks: Vec<(usize, Option<String>)>,
}

/// Parse a ranking reply for a list of `len` events.
///
/// Tolerates code fences and prose around the JSON object.
pub fn parse_ranking(text: &str, len: usize) -> Option<ParsedRanking> {
    let body = prompts::strip_code_fences(text);
    let reply: RankingReply = serde_json::from_str(&body).ok().or_else(|| {
        let start = body.find('{')?;
        let end = body.rfind('}')?;
        (start < end)
            .then(|| serde_json::from_str(&body[start..=end]).ok())
            .flatten()
    })?;

    let mut seen = HashSet::new();
    let picks: Vec<(usize, Option<String>)> = reply
        .picks
        .into_iter()
        .filter(|pick| pick.index < len && seen.insert(pick.index))
        .map(|pick| {
            let reason = pick
                .reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty());
            (pick.index, reason)
        })
        .collect();

    Some(ParsedRanking {
        summary: reply.summary.trim().to_string(),
        picks,
    })
}

/// Events sorted by date (stable for equal dates).
pub fn date_ordered(mut events: Vec<Event>, max_results: usize) -> Vec<RankedEvent> {
    events.sort_by_key(|e| e.date);
    events
        .into_iter()
        .take(max_results)
        .map(RankedEvent::unranked)
        .collect()
}

fn fallback_explanation(total: usize, shown: usize) -> String {
    if shown < total {
        format!(
            "I found {} events from your sources but couldn't rank them right now. Here are the earliest {} by date.",
            total, shown
        )
    } else {
        format!(
            "I found {} events from your sources but couldn't rank them right now. Here they are by date.",
            total
        )
    }
}

/// Ranks a non-empty event set with the generation capability.
pub struct EventRanker {
    provider: Arc<dyn LlmProvider>,
    max_results: usize,
}

impl EventRanker {
    pub fn new(provider: Arc<dyn LlmProvider>, max_results: usize) -> Self {
        Self {
            provider,
            max_results: max_results.max(1),
        }
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Rank `events` for `interest`. Falls back to date order on any failure.
    pub async fn rank(&self, interest: &str, history: &[Message], events: Vec<Event>) -> Ranking {
        let mut messages = history.to_vec();
        messages.push(Message::user(interest));
        let system = prompts::ranking_system_prompt(&events);

        let reply = match self
            .provider
            .send_message(messages, Some(system), LlmRequestOptions::precise())
            .await
            .and_then(|response| response.into_text())
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("[aggregation] Ranking call failed, using date order: {}", e);
                return self.fallback(events, None);
            }
        };

        match parse_ranking(&reply, events.len()) {
            Some(parsed) if !parsed.picks.is_empty() => self.apply(parsed, events),
            Some(parsed) => {
                tracing::warn!("[aggregation] Ranking reply had no usable picks, using date order");
                let summary = Some(parsed.summary).filter(|s| !s.is_empty());
                self.fallback(events, summary)
            }
            None => {
                tracing::warn!("[aggregation] Ranking reply was not valid JSON, using date order");
                self.fallback(events, None)
            }
        }
    }

    fn apply(&self, parsed: ParsedRanking, events: Vec<Event>) -> Ranking {
        let mut slots: Vec<Option<Event>> = events.into_iter().map(Some).collect();
        let ranked: Vec<RankedEvent> = parsed
            .picks
            .into_iter()
            .filter_map(|(index, reason)| {
                slots[index].take().map(|event| RankedEvent { event, reason })
            })
            .take(self.max_results)
            .collect();

        let explanation = if parsed.summary.is_empty() {
            format!("Here are the {} events that best match what you're looking for.", ranked.len())
        } else {
            parsed.summary
        };

        Ranking {
            explanation,
            events: ranked,
            ranked: true,
        }
    }

    fn fallback(&self, events: Vec<Event>, summary: Option<String>) -> Ranking {
        let total = events.len();
        let events = date_ordered(events, self.max_results);
        let explanation = summary.unwrap_or_else(|| fallback_explanation(total, events.len()));
        Ranking {
            explanation,
            events,
            ranked: false,
        }
    }
}
