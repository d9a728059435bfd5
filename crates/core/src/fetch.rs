//! Page Fetching Capability
//!
//! "Given a URL, return a textual representation of the page." The concrete
//! HTTP implementation lives in `eventfinder-tools`; plugins and the plugin
//! generator only see this trait.

use async_trait::async_trait;
use thiserror::Error;

/// Reasons a page could not be turned into text.
///
/// Every variant is recoverable: callers report it and carry on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The URL could not be parsed or has no host
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The URL points at a private or local address
    #[error("Blocked: {0}")]
    Blocked(String),

    /// Connection, DNS, TLS or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("HTTP error: {status} {reason}")]
    Http { status: u16, reason: String },

    /// Response was not an HTML document
    #[error("Unsupported content type: {0}")]
    NotHtml(String),

    /// Response exceeded the download limit
    #[error("Content too large: {0} bytes")]
    TooLarge(u64),

    /// Page converted to an empty document
    #[error("Page has no readable content")]
    Empty,
}

/// Result type alias for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Capability that turns a URL into normalized text (markdown).
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return its readable content.
    async fn fetch(&self, url: &str) -> FetchResult<String>;
}
