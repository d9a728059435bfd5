//! LLM Types
//!
//! Provider selection and configuration, the message model, responses and
//! the error taxonomy shared by every provider.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Configuration
// ============================================================================

/// Supported LLM provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Anthropic,
    OpenAI,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Anthropic => "anthropic",
            ProviderType::OpenAI => "openai",
        }
    }

    /// Environment variable holding the API key for this provider.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderType::Anthropic => "ANTHROPIC_API_KEY",
            ProviderType::OpenAI => "OPENAI_API_KEY",
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for the generation capability, stored under `provider` in config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: ProviderType,
    /// Never written to disk; filled in from the environment at startup.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Endpoint override, e.g. an OpenAI-compatible local server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::Anthropic,
            api_key: None,
            base_url: None,
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_secs: None,
        }
    }
}

impl ProviderConfig {
    /// The API key, or `MissingApiKey` naming the variable to set.
    pub fn require_api_key(&self) -> LlmResult<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(LlmError::MissingApiKey {
                provider: self.provider.as_str(),
                env_var: self.provider.api_key_env(),
            })
    }
}

/// Per-call overrides of the configured sampling settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmRequestOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl LlmRequestOptions {
    /// Low temperature for structured output (rankings, drafted definitions).
    pub fn precise() -> Self {
        Self {
            temperature: Some(0.2),
            max_tokens: None,
        }
    }

    pub fn temperature(&self, config: &ProviderConfig) -> f32 {
        self.temperature.unwrap_or(config.temperature)
    }

    pub fn max_tokens(&self, config: &ProviderConfig) -> u32 {
        self.max_tokens.unwrap_or(config.max_tokens)
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// One text message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn text(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text(MessageRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(MessageRole::Assistant, text)
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Why the model stopped producing output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Complete,
    TokenLimit,
    Other(String),
}

impl StopReason {
    /// Map a provider's finish reason (`end_turn`, `stop`, `max_tokens`, `length`, ...).
    pub fn parse(raw: &str) -> Self {
        match raw {
            "end_turn" | "stop" | "stop_sequence" => StopReason::Complete,
            "max_tokens" | "length" => StopReason::TokenLimit,
            other => StopReason::Other(other.to_string()),
        }
    }
}

/// A completed generation call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: Option<String>,
    pub stop_reason: StopReason,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// A complete response carrying `text`.
    pub fn text(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            stop_reason: StopReason::Complete,
            model: model.into(),
            input_tokens: 0,
            output_tokens: 0,
        }
    }

    /// The text, or `EmptyResponse` when the model said nothing.
    pub fn into_text(self) -> LlmResult<String> {
        match self.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(LlmError::EmptyResponse(self.model)),
        }
    }

    /// Whether the output was cut off by the token limit.
    pub fn is_truncated(&self) -> bool {
        self.stop_reason == StopReason::TokenLimit
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("no API key configured for {provider} (set {env_var})")]
    MissingApiKey {
        provider: &'static str,
        env_var: &'static str,
    },

    #[error("{provider} rejected the credentials: {message}")]
    Unauthorized {
        provider: &'static str,
        message: String,
    },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unreadable response: {0}")]
    Parse(String),

    #[error("Empty response from {0}")]
    EmptyResponse(String),
}

impl LlmError {
    /// Map a non-success HTTP status and its body.
    pub fn from_status(provider: &'static str, status: u16, body: &str) -> Self {
        let message = body.trim().to_string();
        match status {
            401 | 403 => LlmError::Unauthorized { provider, message },
            404 => LlmError::ModelNotFound(message),
            429 => LlmError::RateLimited(message),
            400..=499 => LlmError::InvalidRequest(format!("HTTP {}: {}", status, message)),
            _ => LlmError::Server { status, message },
        }
    }

    /// Whether retrying later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited(_) | LlmError::Server { .. } | LlmError::Network(_)
        )
    }

    /// Whether the provider setup (key, model) needs fixing.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LlmError::MissingApiKey { .. } | LlmError::Unauthorized { .. } | LlmError::ModelNotFound(_)
        )
    }
}

pub type LlmResult<T> = Result<T, LlmError>;
