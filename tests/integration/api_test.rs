//! HTTP Handler Integration Tests
//!
//! Drives the axum handlers directly with extracted arguments.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use eventfinder::commands::{
    delete_conversation, get_conversation, get_health, list_plugins, post_chat, reload_plugins,
};
use eventfinder::{router, AppError, ChatRequest};

use crate::support::{app_state, fixed_definition, write_definition, MapFetcher, ScriptedProvider};

fn chat_request(message: &str, conversation_id: Option<&str>) -> Json<ChatRequest> {
    Json(ChatRequest {
        message: message.to_string(),
        conversation_id: conversation_id.map(str::to_string),
    })
}

#[tokio::test]
async fn test_router_builds() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(dir.path(), MapFetcher::new(), ScriptedProvider::replying("hi"));
    let _app = router(state);
}

#[tokio::test]
async fn test_health_reports_plugin_count() {
    let dir = tempfile::tempdir().unwrap();
    write_definition(dir.path(), "alpha.toml", &fixed_definition("Alpha", "https://alpha.example.com"));
    let state = app_state(dir.path(), MapFetcher::new(), ScriptedProvider::replying("hi"));
    state.loader().discover().await;

    let Json(health) = get_health(State(state)).await;

    assert_eq!(health.status, "healthy");
    assert_eq!(health.service, "eventfinder");
    assert_eq!(health.plugins, 1);
}

#[tokio::test]
async fn test_list_and_reload_plugins() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(dir.path(), MapFetcher::new(), ScriptedProvider::replying("hi"));

    let Json(before) = list_plugins(State(state.clone())).await;
    assert!(before.is_empty());

    write_definition(dir.path(), "alpha.toml", &fixed_definition("Alpha", "https://alpha.example.com"));
    let Json(report) = reload_plugins(State(state.clone())).await;
    assert_eq!(report.loaded, vec!["Alpha"]);

    let Json(after) = list_plugins(State(state)).await;
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].name, "Alpha");
    assert_eq!(after[0].source_url, "https://alpha.example.com");
}

#[tokio::test]
async fn test_empty_chat_message_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::replying("hi");
    let state = app_state(dir.path(), MapFetcher::new(), provider.clone());

    let err = post_chat(State(state), chat_request("   ", None)).await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_conversation_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(dir.path(), MapFetcher::new(), ScriptedProvider::replying("Hey!"));

    let Json(reply) = post_chat(State(state.clone()), chat_request("hi there", None))
        .await
        .unwrap();
    assert_eq!(reply.response, "Hey!");
    let id = reply.conversation_id.clone();

    let Json(history) = get_conversation(State(state.clone()), Path(id.clone()))
        .await
        .unwrap();
    assert_eq!(history.conversation_id, id);
    assert_eq!(history.messages.len(), 2);
    assert_eq!(history.messages[0].content, "hi there");

    let Json(deleted) = delete_conversation(State(state.clone()), Path(id.clone()))
        .await
        .unwrap();
    assert!(deleted.success);

    let missing = get_conversation(State(state.clone()), Path(id.clone()))
        .await
        .unwrap_err();
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    let missing = delete_conversation(State(state), Path(id)).await.unwrap_err();
    assert!(matches!(missing, AppError::NotFound(_)));
}
