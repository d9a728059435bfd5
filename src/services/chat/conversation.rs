//! Conversation Store
//!
//! In-memory, per-conversation history. Each conversation has its own lock;
//! the map lock is only held to look a conversation up or insert it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use eventfinder_llm::{Message, MessageRole};

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: MessageRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        Message::text(turn.role, turn.content.clone())
    }
}

/// History of one conversation.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    pub turns: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// History in the shape the generation capability takes.
    pub fn messages(&self) -> Vec<Message> {
        self.turns.iter().map(Message::from).collect()
    }

    /// Append a completed exchange.
    pub fn record_exchange(&mut self, user: &str, assistant: &str) {
        self.turns.push(Turn::user(user));
        self.turns.push(Turn::assistant(assistant));
        self.updated_at = Utc::now();
    }
}

pub type ConversationHandle = Arc<Mutex<Conversation>>;

/// All live conversations.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, ConversationHandle>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `id` to a conversation, starting a new one (with a fresh id)
    /// when it is absent or unknown.
    pub async fn get_or_create(&self, id: Option<&str>) -> (String, ConversationHandle) {
        if let Some(id) = id {
            if let Some(existing) = self.conversations.read().await.get(id) {
                return (id.to_string(), existing.clone());
            }
            tracing::debug!("[chat] Unknown conversation '{}', starting a new one", id);
        }

        let id = Uuid::new_v4().to_string();
        let handle = Arc::new(Mutex::new(Conversation::new(id.clone())));
        self.conversations
            .write()
            .await
            .insert(id.clone(), handle.clone());
        (id, handle)
    }

    /// Copy of a conversation's turns.
    pub async fn history(&self, id: &str) -> Option<Vec<Turn>> {
        let handle = self.conversations.read().await.get(id).cloned()?;
        let turns = handle.lock().await.turns.clone();
        Some(turns)
    }

    /// Forget a conversation. Returns whether it existed.
    pub async fn clear(&self, id: &str) -> bool {
        self.conversations.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.read().await.is_empty()
    }
}
