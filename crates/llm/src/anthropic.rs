//! Anthropic Messages API provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http_client::{build_http_client, send_json};
use super::provider::LlmProvider;
use super::types::{
    LlmRequestOptions, LlmResponse, LlmResult, Message, MessageRole, ProviderConfig, StopReason,
};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<&'a Message>,
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    model: String,
    content: Vec<Block>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let client = build_http_client(config.request_timeout_secs);
        Self { config, client }
    }

    fn endpoint(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(MESSAGES_URL)
    }

    /// System text travels outside the message list, so system-role turns are skipped.
    fn request<'a>(
        &'a self,
        messages: &'a [Message],
        system: Option<&'a str>,
        options: &LlmRequestOptions,
    ) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.config.model,
            max_tokens: options.max_tokens(&self.config),
            temperature: options.temperature(&self.config),
            system,
            messages: messages
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .collect(),
        }
    }
}

impl MessagesReply {
    fn into_response(self) -> LlmResponse {
        let text: String = self
            .content
            .into_iter()
            .filter_map(|block| match block {
                Block::Text { text } => Some(text),
                Block::Other => None,
            })
            .collect();

        LlmResponse {
            content: (!text.is_empty()).then_some(text),
            stop_reason: self
                .stop_reason
                .as_deref()
                .map_or(StopReason::Complete, StopReason::parse),
            model: self.model,
            input_tokens: self.usage.input_tokens,
            output_tokens: self.usage.output_tokens,
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let api_key = self.config.require_api_key()?;
        let body = self.request(&messages, system.as_deref(), &request_options);

        let request = self
            .client
            .post(self.endpoint())
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);

        let reply: MessagesReply = send_json(self.name(), request).await?;
        Ok(reply.into_response())
    }
}
