//! WebFetch Service
//!
//! Fetches web pages, converts HTML to markdown, with caching and SSRF protection.
//! This is the production [`PageFetcher`] handed to plugins and the generator.

use std::time::Duration;

use async_trait::async_trait;
use mini_moka::sync::Cache;

use eventfinder_core::{FetchError, FetchResult, PageFetcher};

use crate::url_validation::validate_url_ssrf;

/// Maximum download size (10MB)
const MAX_DOWNLOAD_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum output size (100KB)
const MAX_OUTPUT_SIZE: usize = 100 * 1024;

/// Maximum cache entries
const MAX_CACHE_ENTRIES: u64 = 100;

/// Tunables for [`WebFetchService`].
#[derive(Debug, Clone)]
pub struct WebFetchOptions {
    /// Per-request timeout
    pub timeout_secs: u64,
    /// How long a fetched page is served from cache
    pub cache_ttl_secs: u64,
    /// Maximum redirects followed
    pub max_redirects: usize,
}

impl Default for WebFetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            cache_ttl_secs: 300,
            max_redirects: 5,
        }
    }
}

/// WebFetch service with persistent client and in-memory cache
pub struct WebFetchService {
    client: reqwest::Client,
    cache: Cache<String, String>,
}

impl WebFetchService {
    /// Create a new WebFetch service
    pub fn new(options: WebFetchOptions) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .user_agent(concat!("EventFinder/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(options.max_redirects))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("[WebFetch] Failed to build HTTP client, using defaults: {}", e);
                reqwest::Client::new()
            });

        let cache = Cache::builder()
            .max_capacity(MAX_CACHE_ENTRIES)
            .time_to_live(Duration::from_secs(options.cache_ttl_secs))
            .build();

        Self { client, cache }
    }

    /// Fetch a URL and return its content as markdown.
    pub async fn fetch_markdown(&self, url_str: &str) -> FetchResult<String> {
        let url = validate_url_ssrf(&upgrade_to_https(url_str)).await?;
        let url_string = url.to_string();

        if let Some(cached) = self.cache.get(&url_string) {
            tracing::debug!("[WebFetch] Cache hit for {}", url_string);
            return Ok(cached);
        }

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        if let Some(content_length) = response.content_length() {
            if content_length > MAX_DOWNLOAD_SIZE {
                return Err(FetchError::TooLarge(content_length));
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to read response body: {}", e)))?;

        if bytes.len() as u64 > MAX_DOWNLOAD_SIZE {
            return Err(FetchError::TooLarge(bytes.len() as u64));
        }

        let body = String::from_utf8_lossy(&bytes).to_string();
        let result = render_body(&content_type, &body)?;
        let result = truncate_output(result);

        if result.trim().is_empty() {
            return Err(FetchError::Empty);
        }

        tracing::info!(
            "[WebFetch] Fetched {} ({} chars of markdown)",
            url_string,
            result.len()
        );
        self.cache.insert(url_string, result.clone());

        Ok(result)
    }
}

impl Default for WebFetchService {
    fn default() -> Self {
        Self::new(WebFetchOptions::default())
    }
}

#[async_trait]
impl PageFetcher for WebFetchService {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        self.fetch_markdown(url).await
    }
}

/// Auto-upgrade HTTP to HTTPS
fn upgrade_to_https(url_str: &str) -> String {
    let trimmed = url_str.trim();
    match trimmed.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => trimmed.to_string(),
    }
}

/// Turn a response body into text according to its content type.
fn render_body(content_type: &str, body: &str) -> FetchResult<String> {
    let is_html = content_type.contains("text/html")
        || content_type.contains("application/xhtml")
        || (content_type.is_empty() && looks_like_html(body));

    if is_html {
        return htmd::convert(body).map_err(|e| FetchError::Network(format!(
            "Failed to convert HTML: {}",
            e
        )));
    }

    if content_type.starts_with("text/")
        || content_type.contains("json")
        || content_type.contains("xml")
        || content_type.is_empty()
    {
        return Ok(body.to_string());
    }

    Err(FetchError::NotHtml(content_type.to_string()))
}

fn looks_like_html(body: &str) -> bool {
    let head: String = body.chars().take(512).collect::<String>().to_lowercase();
    head.contains("<html") || head.contains("<!doctype html")
}

/// Cap output at `MAX_OUTPUT_SIZE` bytes on a char boundary.
fn truncate_output(result: String) -> String {
    if result.len() <= MAX_OUTPUT_SIZE {
        return result;
    }
    let mut cut = MAX_OUTPUT_SIZE;
    while !result.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut truncated = result[..cut].to_string();
    truncated.push_str("\n\n... (content truncated)");
    truncated
}
