//! Settings Models
//!
//! Application configuration and settings data structures.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use eventfinder_llm::{ProviderConfig, ProviderType};

/// Application configuration stored in config.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP API listens on
    pub bind_addr: String,
    /// Plugin definition directory; `None` means `~/.eventfinder/plugins`
    #[serde(default)]
    pub plugins_dir: Option<PathBuf>,
    /// Hot-reload definitions when the plugin directory changes
    pub watch_plugins: bool,
    /// Generation capability settings (API key comes from the environment)
    pub provider: ProviderConfig,
    /// Per-plugin scrape timeout during aggregation
    pub scrape_timeout_secs: u64,
    /// Timeout for the post-generation smoke test
    pub smoke_test_timeout_secs: u64,
    /// Page fetch timeout
    pub fetch_timeout_secs: u64,
    /// How long fetched pages are cached
    pub fetch_cache_ttl_secs: u64,
    /// Maximum events returned per search
    pub max_results: usize,
    /// Fetched page characters handed to the drafting prompt
    pub max_page_chars: usize,
    /// Origins allowed by CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Intent classification vocabulary
    #[serde(default)]
    pub intent: IntentConfig,
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            plugins_dir: None,
            watch_plugins: true,
            provider: ProviderConfig::default(),
            scrape_timeout_secs: 30,
            smoke_test_timeout_secs: 30,
            fetch_timeout_secs: 30,
            fetch_cache_ttl_secs: 300,
            max_results: 10,
            max_page_chars: 8000,
            allowed_origins: default_allowed_origins(),
            intent: IntentConfig::default(),
        }
    }
}

/// Keywords and patterns used to route a chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentConfig {
    /// Case-insensitive substrings that mark a search request
    pub search_keywords: Vec<String>,
    /// Regexes that mark a plugin-generation request; group 1 captures the target
    pub generation_patterns: Vec<String>,
}

impl Default for IntentConfig {
    fn default() -> Self {
        let search_keywords = [
            "find",
            "search",
            "events",
            "hackathons",
            "meetups",
            "conferences",
            "workshops",
            "looking for",
            "show me",
            "what's happening",
            "happening",
            "recommend",
            "suggestions",
        ];
        let generation_patterns = [
            r"(?:create|make|generate|build|add)\s+(?:a\s+|an\s+)?(?:new\s+)?(?:plugin|scraper)\s+for\s+(\S+)",
            r"^\s*scrape\s+(\S+)",
        ];
        Self {
            search_keywords: search_keywords.iter().map(|s| s.to_string()).collect(),
            generation_patterns: generation_patterns.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub bind_addr: Option<String>,
    pub plugins_dir: Option<PathBuf>,
    pub watch_plugins: Option<bool>,
    pub provider: Option<ProviderType>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub scrape_timeout_secs: Option<u64>,
    pub max_results: Option<usize>,
}

impl AppConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(bind_addr) = update.bind_addr {
            self.bind_addr = bind_addr;
        }
        if let Some(dir) = update.plugins_dir {
            self.plugins_dir = Some(dir);
        }
        if let Some(watch) = update.watch_plugins {
            self.watch_plugins = watch;
        }
        if let Some(provider) = update.provider {
            self.provider.provider = provider;
        }
        if let Some(model) = update.model {
            self.provider.model = model;
        }
        if let Some(base_url) = update.base_url {
            self.provider.base_url = Some(base_url).filter(|u| !u.trim().is_empty());
        }
        if let Some(timeout) = update.scrape_timeout_secs {
            self.scrape_timeout_secs = timeout;
        }
        if let Some(max) = update.max_results {
            self.max_results = max;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("Invalid bind_addr: {}", self.bind_addr));
        }

        if self.provider.model.trim().is_empty() {
            return Err("provider.model must not be empty".to_string());
        }

        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(format!(
                "provider.temperature must be within 0.0..=2.0, got {}",
                self.provider.temperature
            ));
        }

        for (field, value) in [
            ("scrape_timeout_secs", self.scrape_timeout_secs),
            ("smoke_test_timeout_secs", self.smoke_test_timeout_secs),
            ("fetch_timeout_secs", self.fetch_timeout_secs),
        ] {
            if value == 0 || value > 600 {
                return Err(format!("{} must be between 1 and 600", field));
            }
        }

        if self.max_results == 0 || self.max_results > 100 {
            return Err("max_results must be between 1 and 100".to_string());
        }

        if self.max_page_chars < 500 {
            return Err("max_page_chars must be at least 500".to_string());
        }

        for pattern in &self.intent.generation_patterns {
            if let Err(e) = regex::Regex::new(pattern) {
                return Err(format!("Invalid generation pattern '{}': {}", pattern, e));
            }
        }

        Ok(())
    }
}
