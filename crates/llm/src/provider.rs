//! LLM Provider Trait

use std::sync::Arc;

use async_trait::async_trait;

use super::anthropic::AnthropicProvider;
use super::openai::OpenAIProvider;
use super::types::{LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig, ProviderType};

/// A text generation backend.
///
/// Given a system prompt and a conversation (oldest message first), return
/// the model's reply. Implementations hold no conversation state.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider identifier used in logs.
    fn name(&self) -> &'static str;

    fn model(&self) -> &str;

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse>;
}

/// Build the provider selected by `config.provider`.
pub fn create_provider(config: ProviderConfig) -> Arc<dyn LlmProvider> {
    tracing::debug!(
        "[llm] Using {} provider with model {}",
        config.provider,
        config.model
    );
    match config.provider {
        ProviderType::Anthropic => Arc::new(AnthropicProvider::new(config)),
        ProviderType::OpenAI => Arc::new(OpenAIProvider::new(config)),
    }
}
