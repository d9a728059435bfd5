//! Chat Commands
//!
//! Chat turns and conversation history.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::models::response::{ChatRequest, ChatResponse, CommandResponse, ConversationResponse};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

/// `POST /api/chat`
pub async fn post_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(AppError::validation("message must not be empty"));
    }

    let response = state
        .orchestrator()
        .handle_message(message, request.conversation_id.as_deref())
        .await;
    Ok(Json(response))
}

/// `GET /api/conversations/{id}`
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ConversationResponse>> {
    let messages = state
        .orchestrator()
        .conversation(&id)
        .await
        .ok_or_else(|| AppError::not_found(format!("conversation '{}'", id)))?;
    Ok(Json(ConversationResponse {
        conversation_id: id,
        messages,
    }))
}

/// `DELETE /api/conversations/{id}`
pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<CommandResponse<String>>> {
    if state.orchestrator().clear_conversation(&id).await {
        Ok(Json(CommandResponse::ok(id)))
    } else {
        Err(AppError::not_found(format!("conversation '{}'", id)))
    }
}
