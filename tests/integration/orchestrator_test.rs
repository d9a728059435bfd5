//! Conversation Orchestrator Integration Tests
//!
//! Chat turns through the fully wired application state: routing, history
//! and conversation lifecycle.

use std::sync::atomic::Ordering;

use eventfinder::services::prompts;
use eventfinder_llm::MessageRole;

use crate::support::{
    app_state, event, is_drafting_prompt, is_ranking_prompt, Behavior, MapFetcher, ScriptedPlugin,
    ScriptedProvider,
};

const FIXED_DRAFT: &str = r#"name = "Draft"
source_url = "https://draft.example.org"
description = "Events listed on example.com"

[scraper]
kind = "fixed"

[[scraper.events]]
title = "Example Launch Party"
url = "https://example.com/events/launch"
date = "2099-06-01T18:00:00"
"#;

/// Answers chat, ranking and drafting prompts differently.
fn routed_provider() -> std::sync::Arc<ScriptedProvider> {
    ScriptedProvider::with(|system, _| {
        if is_ranking_prompt(system) {
            Ok(r#"{"summary": "These look great for you.", "picks": [{"index": 0, "reason": "AI focus"}]}"#.to_string())
        } else if is_drafting_prompt(system) {
            Ok(FIXED_DRAFT.to_string())
        } else {
            Ok("Hello! Ask me about tech events.".to_string())
        }
    })
}

#[tokio::test]
async fn test_small_talk_only_reaches_chat() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = MapFetcher::new();
    let provider = routed_provider();
    let state = app_state(dir.path(), fetcher.clone(), provider.clone());
    let plugin = ScriptedPlugin::new(
        "Luma",
        Behavior::Events(vec![event("AI Meetup", "https://lu.ma/1", "2099-05-01", "Luma")]),
    );
    let scrapes = plugin.scrape_counter();
    state.registry().upsert(plugin.into_descriptor()).await;

    let response = state.orchestrator().handle_message("hi there", None).await;

    assert_eq!(response.response, "Hello! Ask me about tech events.");
    assert!(response.events.is_empty());
    assert_eq!(scrapes.load(Ordering::SeqCst), 0);
    assert_eq!(fetcher.call_count(), 0);
    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].system, prompts::chat_system_prompt());
    assert_eq!(state.registry().len().await, 1);
}

#[tokio::test]
async fn test_search_turn_returns_ranked_events() {
    let dir = tempfile::tempdir().unwrap();
    let provider = routed_provider();
    let state = app_state(dir.path(), MapFetcher::new(), provider.clone());
    state
        .registry()
        .upsert(
            ScriptedPlugin::new(
                "Luma",
                Behavior::Events(vec![
                    event("AI Meetup", "https://lu.ma/1", "2099-05-01", "Luma"),
                    event("Rust Night", "https://lu.ma/2", "2099-05-02", "Luma"),
                ]),
            )
            .into_descriptor(),
        )
        .await;

    let response = state.orchestrator().handle_message("find AI meetups", None).await;

    assert_eq!(response.response, "These look great for you.");
    assert_eq!(response.events.len(), 1);
    assert_eq!(response.events[0].event.title, "AI Meetup");
    assert_eq!(response.events[0].reason.as_deref(), Some("AI focus"));
}

#[tokio::test]
async fn test_follow_up_carries_history() {
    let dir = tempfile::tempdir().unwrap();
    let provider = routed_provider();
    let state = app_state(dir.path(), MapFetcher::new(), provider.clone());
    state
        .registry()
        .upsert(
            ScriptedPlugin::new(
                "Luma",
                Behavior::Events(vec![event("AI Meetup", "https://lu.ma/1", "2099-05-01", "Luma")]),
            )
            .into_descriptor(),
        )
        .await;

    let first = state.orchestrator().handle_message("hello", None).await;
    let second = state
        .orchestrator()
        .handle_message("show me meetups", Some(&first.conversation_id))
        .await;

    assert_eq!(second.conversation_id, first.conversation_id);
    let calls = provider.calls();
    assert_eq!(calls.len(), 2);
    assert!(is_ranking_prompt(&calls[1].system));
    let contents: Vec<&str> = calls[1].messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["hello", "Hello! Ask me about tech events.", "show me meetups"]
    );

    let history = state
        .orchestrator()
        .conversation(&first.conversation_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[2].role, MessageRole::User);
    assert_eq!(history[3].content, "These look great for you.");
}

#[tokio::test]
async fn test_search_without_plugins_explains() {
    let dir = tempfile::tempdir().unwrap();
    let provider = routed_provider();
    let state = app_state(dir.path(), MapFetcher::new(), provider.clone());

    let response = state.orchestrator().handle_message("find hackathons", None).await;

    assert!(response.events.is_empty());
    assert!(response.response.starts_with("No matching events found."));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_generation_turn_activates_plugin() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = MapFetcher::with_pages(&[(
        "https://example.com/events",
        "- [Launch Party](https://example.com/events/launch) Jun 1",
    )]);
    let state = app_state(dir.path(), fetcher, routed_provider());

    let response = state
        .orchestrator()
        .handle_message("Create a plugin for https://example.com/events", None)
        .await;

    assert!(response.response.starts_with("Successfully created plugin"));
    assert!(response.events.is_empty());
    assert_eq!(state.registry().names().await, vec!["ExampleCom"]);
    assert!(dir.path().join("example_com.toml").exists());

    let search = state
        .orchestrator()
        .handle_message("find events", Some(&response.conversation_id))
        .await;
    assert_eq!(search.events.len(), 1);
    assert_eq!(search.events[0].event.source, "ExampleCom");
}

#[tokio::test]
async fn test_generation_without_site_asks_for_one() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = MapFetcher::new();
    let provider = routed_provider();
    let state = app_state(dir.path(), fetcher.clone(), provider.clone());

    let response = state
        .orchestrator()
        .handle_message("create a plugin for my favourite site", None)
        .await;

    assert!(response.response.contains("which site"));
    assert_eq!(fetcher.call_count(), 0);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_generation_with_two_sites_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = MapFetcher::new();
    let state = app_state(dir.path(), fetcher.clone(), routed_provider());

    let response = state
        .orchestrator()
        .handle_message("create a plugin for lu.ma/sf and meetup.com", None)
        .await;

    assert!(response.response.contains("one plugin at a time"));
    assert!(response.response.contains("https://lu.ma/sf"));
    assert!(response.response.contains("https://meetup.com"));
    assert_eq!(fetcher.call_count(), 0);
    assert!(state.registry().is_empty().await);
}

#[tokio::test]
async fn test_chat_failure_becomes_apology() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(dir.path(), MapFetcher::new(), ScriptedProvider::failing());

    let response = state.orchestrator().handle_message("hi there", None).await;

    assert!(!response.response.is_empty());
    let history = state
        .orchestrator()
        .conversation(&response.conversation_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, response.response);
}

#[tokio::test]
async fn test_unknown_conversation_id_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(dir.path(), MapFetcher::new(), routed_provider());

    let response = state
        .orchestrator()
        .handle_message("hi there", Some("does-not-exist"))
        .await;

    assert_ne!(response.conversation_id, "does-not-exist");
    assert!(state.orchestrator().conversation("does-not-exist").await.is_none());
    let history = state
        .orchestrator()
        .conversation(&response.conversation_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn test_cleared_conversation_is_gone() {
    let dir = tempfile::tempdir().unwrap();
    let state = app_state(dir.path(), MapFetcher::new(), routed_provider());
    let response = state.orchestrator().handle_message("hi there", None).await;

    assert!(state.orchestrator().clear_conversation(&response.conversation_id).await);
    assert!(!state.orchestrator().clear_conversation(&response.conversation_id).await);
    assert!(state
        .orchestrator()
        .conversation(&response.conversation_id)
        .await
        .is_none());
}
