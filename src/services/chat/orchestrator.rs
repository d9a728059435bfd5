//! Conversation Orchestrator
//!
//! Handles one chat turn: resolve the conversation, classify the message,
//! run search, generation or plain chat, and record the exchange. This is
//! the only place failures are turned into user-facing text; a turn always
//! produces a response.

use std::sync::Arc;

use eventfinder_llm::{LlmError, LlmProvider, LlmRequestOptions, Message};

use super::conversation::{ConversationStore, Turn};
use super::intent::{Intent, IntentClassifier, TargetUrl};
use crate::models::response::ChatResponse;
use crate::services::aggregation::{AggregationEngine, RankedEvent};
use crate::services::plugins::PluginGenerator;
use crate::services::prompts;

/// Routes chat turns to the search engine, the generator or the model.
pub struct ChatOrchestrator {
    classifier: IntentClassifier,
    conversations: ConversationStore,
    engine: Arc<AggregationEngine>,
    generator: Arc<PluginGenerator>,
    provider: Arc<dyn LlmProvider>,
}

impl ChatOrchestrator {
    pub fn new(
        classifier: IntentClassifier,
        engine: Arc<AggregationEngine>,
        generator: Arc<PluginGenerator>,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            classifier,
            conversations: ConversationStore::new(),
            engine,
            generator,
            provider,
        }
    }

    /// Process one message and record the exchange.
    pub async fn handle_message(&self, message: &str, conversation_id: Option<&str>) -> ChatResponse {
        let (conversation_id, conversation) = self.conversations.get_or_create(conversation_id).await;
        let history = conversation.lock().await.messages();

        let intent = self.classifier.classify(message);
        tracing::info!(
            "[chat] {}: classified as {}",
            conversation_id,
            intent_label(&intent)
        );

        let (response, events) = match intent {
            Intent::Generate(target) => (self.generate(target).await, Vec::new()),
            Intent::Search => self.search(message, &history).await,
            Intent::Chat => (self.chat(message, &history).await, Vec::new()),
        };

        conversation.lock().await.record_exchange(message, &response);

        ChatResponse {
            response,
            conversation_id,
            events,
        }
    }

    /// History of a conversation, if it exists.
    pub async fn conversation(&self, id: &str) -> Option<Vec<Turn>> {
        self.conversations.history(id).await
    }

    /// Drop a conversation. Returns whether it existed.
    pub async fn clear_conversation(&self, id: &str) -> bool {
        let cleared = self.conversations.clear(id).await;
        if cleared {
            tracing::info!("[chat] Cleared conversation {}", id);
        }
        cleared
    }

    async fn search(&self, message: &str, history: &[Message]) -> (String, Vec<RankedEvent>) {
        let outcome = self.engine.find(message, history).await;
        for failure in &outcome.failures {
            tracing::debug!("[chat] Source {} unavailable: {}", failure.plugin, failure.reason);
        }
        (outcome.explanation, outcome.events)
    }

    async fn generate(&self, target: TargetUrl) -> String {
        match target {
            TargetUrl::Found(url) => self.generator.generate(&url).await.message(),
            TargetUrl::Missing => "I can create a plugin for a new event source, but I need to know which site. \
                 Try something like \"create a plugin for lu.ma/sf\"."
                .to_string(),
            TargetUrl::Ambiguous(urls) => format!(
                "I can only create one plugin at a time, but your message mentions several sites ({}). \
                 Which one should I use?",
                urls.join(", ")
            ),
        }
    }

    async fn chat(&self, message: &str, history: &[Message]) -> String {
        let mut messages = history.to_vec();
        messages.push(Message::user(message));

        let reply = self
            .provider
            .send_message(
                messages,
                Some(prompts::chat_system_prompt()),
                LlmRequestOptions::default(),
            )
            .await
            .and_then(|response| response.into_text());

        match reply {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("[chat] Generation failed: {}", e);
                llm_failure_message(&e)
            }
        }
    }
}

fn intent_label(intent: &Intent) -> &'static str {
    match intent {
        Intent::Search => "search",
        Intent::Generate(_) => "generate",
        Intent::Chat => "chat",
    }
}

/// User-facing text for a failed generation call.
pub fn llm_failure_message(error: &LlmError) -> String {
    let text = if error.is_configuration() {
        "The AI service isn't set up correctly. Please check the configured API key and model."
    } else {
        match error {
            LlmError::RateLimited(_) => {
                "I'm currently experiencing high demand. Please try again in a moment."
            }
            LlmError::EmptyResponse(_) => {
                "I apologize, but I couldn't generate a response. Please try again."
            }
            e if e.is_transient() => {
                "I encountered an error communicating with the AI service. Please try again later."
            }
            _ => "I encountered an unexpected error. Please try again later.",
        }
    };
    text.to_string()
}
