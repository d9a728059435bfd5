//! Chat
//!
//! - intent.rs:        message routing (search, plugin generation, plain chat)
//! - conversation.rs:  per-conversation history
//! - orchestrator.rs:  one turn end to end

pub mod conversation;
pub mod intent;
pub mod orchestrator;

pub use conversation::{Conversation, ConversationStore, Turn};
pub use intent::{Intent, IntentClassifier, TargetUrl};
pub use orchestrator::ChatOrchestrator;
