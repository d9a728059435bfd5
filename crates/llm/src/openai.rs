//! OpenAI Chat Completions provider.
//!
//! A `base_url` override points it at any OpenAI-compatible endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http_client::{build_http_client, send_json};
use super::provider::LlmProvider;
use super::types::{
    LlmRequestOptions, LlmResponse, LlmResult, Message, MessageRole, ProviderConfig, StopReason,
};

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAIProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    /// Reasoning models reject the field entirely.
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl OpenAIProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let client = build_http_client(config.request_timeout_secs);
        Self { config, client }
    }

    fn endpoint(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(COMPLETIONS_URL)
    }

    fn is_reasoning_model(&self) -> bool {
        let model = self.config.model.to_lowercase();
        ["o1", "o3", "o4"].iter().any(|prefix| model.starts_with(prefix))
    }

    /// The system prompt becomes the leading message.
    fn request(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        options: &LlmRequestOptions,
    ) -> CompletionRequest<'_> {
        let messages = system
            .map(|text| Message::text(MessageRole::System, text))
            .into_iter()
            .chain(messages)
            .collect();

        CompletionRequest {
            model: &self.config.model,
            max_tokens: options.max_tokens(&self.config),
            temperature: (!self.is_reasoning_model()).then(|| options.temperature(&self.config)),
            messages,
        }
    }
}

impl CompletionReply {
    fn into_response(self) -> LlmResponse {
        let choice = self.choices.into_iter().next();
        let stop_reason = choice
            .as_ref()
            .and_then(|c| c.finish_reason.as_deref())
            .map_or(StopReason::Complete, StopReason::parse);
        let (input_tokens, output_tokens) = self
            .usage
            .map_or((0, 0), |u| (u.prompt_tokens, u.completion_tokens));

        LlmResponse {
            content: choice.and_then(|c| c.message).and_then(|m| m.content),
            stop_reason,
            model: self.model,
            input_tokens,
            output_tokens,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
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
        let body = self.request(messages, system, &request_options);

        let request = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body);

        let reply: CompletionReply = send_json(self.name(), request).await?;
        Ok(reply.into_response())
    }
}
