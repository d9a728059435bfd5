//! EventFinder LLM
//!
//! Provides the text generation capability behind a single trait:
//! - Anthropic Claude (Messages API)
//! - OpenAI and OpenAI-compatible endpoints (Chat Completions API)
//!
//! Callers treat every provider as a black box: given a system prompt and a
//! conversation, return text. Output is non-deterministic and must be
//! validated by the caller.

pub mod anthropic;
pub mod http_client;
pub mod openai;
pub mod provider;
pub mod types;

// Re-export main types
pub use anthropic::AnthropicProvider;
pub use http_client::build_http_client;
pub use openai::OpenAIProvider;
pub use provider::{create_provider, LlmProvider};
pub use types::*;
