//! EventFinder Tools
//!
//! Concrete implementation of the page fetching capability:
//! - `WebFetchService`: HTTP GET, HTML to markdown, in-memory cache
//! - `url_validation`: SSRF checks shared by everything that takes a user URL

pub mod url_validation;
pub mod web_fetch;

pub use url_validation::{is_private_host, is_private_ip, normalize_url, validate_url_ssrf};
pub use web_fetch::{WebFetchOptions, WebFetchService};
