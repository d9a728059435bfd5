//! HTTP plumbing shared by the providers.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::types::{LlmError, LlmResult};

/// Default request timeout for generation calls. Drafting a plugin can take a while.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Build a `reqwest::Client` with the given request timeout.
///
/// Falls back to a default client if the builder rejects the configuration.
pub fn build_http_client(timeout_secs: Option<u64>) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(
            timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        ))
        .user_agent(concat!("eventfinder/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("[llm] Failed to build HTTP client, using defaults: {}", e);
            reqwest::Client::new()
        })
}

/// Send a prepared request and decode a successful JSON reply into `T`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> LlmResult<T> {
    let response = request
        .send()
        .await
        .map_err(|e| LlmError::Network(e.to_string()))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| LlmError::Network(e.to_string()))?;

    if !status.is_success() {
        tracing::warn!("[{}] Request failed with HTTP {}", provider, status.as_u16());
        return Err(LlmError::from_status(provider, status.as_u16(), &body));
    }

    decode(&body)
}

pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> LlmResult<T> {
    serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))
}
