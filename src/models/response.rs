//! Response Types
//!
//! Request and response payloads for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::services::aggregation::RankedEvent;
use crate::services::chat::Turn;

/// Envelope for error bodies and operations without a dedicated payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> CommandResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    /// Number of active plugins
    pub plugins: usize,
}

impl HealthResponse {
    pub fn healthy(plugins: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            service: "eventfinder".to_string(),
            plugins,
        }
    }
}

/// Incoming chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Result of one chat turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: String,
    /// Ranked events for search turns; empty otherwise
    #[serde(default)]
    pub events: Vec<RankedEvent>,
}

/// History of one conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub conversation_id: String,
    pub messages: Vec<Turn>,
}
