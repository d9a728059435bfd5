//! Intent Classification
//!
//! Routes a chat message to generation, search or plain chat. Generation
//! phrasing is checked first ("create a plugin for lu.ma/sf" also contains
//! search words), then search keywords. Both lists come from configuration.

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

use crate::models::settings::IntentConfig;
use crate::utils::error::{AppError, AppResult};

/// What a message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Search,
    Generate(TargetUrl),
    Chat,
}

/// The site a generation request names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetUrl {
    /// Exactly one site, normalized to an absolute URL
    Found(String),
    /// Generation phrasing without any recognizable site
    Missing,
    /// More than one distinct site
    Ambiguous(Vec<String>),
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:https?://)?(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}(?::\d+)?(?:/[^\s]*)?",
        )
        .expect("url regex is valid")
    })
}

/// Absolute URLs mentioned in `message`, deduplicated, in order of mention.
pub fn extract_urls(message: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for found in url_regex().find_iter(message) {
        if message[..found.start()].ends_with('@') {
            continue;
        }
        let raw = found
            .as_str()
            .trim_end_matches(|c: char| ".,;:!?)'\"".contains(c));
        let url = normalize_target(raw);
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

/// Prefix bare domains with `https://`.
pub fn normalize_target(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    }
}

/// Heuristic message router.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    search_keywords: Vec<String>,
    generation_patterns: Vec<Regex>,
}

impl IntentClassifier {
    /// Compile the configured patterns (case-insensitive).
    pub fn from_config(config: &IntentConfig) -> AppResult<Self> {
        let generation_patterns = config
            .generation_patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        AppError::config(format!("Invalid generation pattern '{}': {}", pattern, e))
                    })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let search_keywords = config
            .search_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        Ok(Self {
            search_keywords,
            generation_patterns,
        })
    }

    pub fn classify(&self, message: &str) -> Intent {
        if self.generation_patterns.iter().any(|p| p.is_match(message)) {
            let target = match extract_urls(message).as_slice() {
                [] => TargetUrl::Missing,
                [only] => TargetUrl::Found(only.clone()),
                many => TargetUrl::Ambiguous(many.to_vec()),
            };
            return Intent::Generate(target);
        }

        let lower = message.to_lowercase();
        if self.search_keywords.iter().any(|k| lower.contains(k.as_str())) {
            return Intent::Search;
        }

        Intent::Chat
    }
}
