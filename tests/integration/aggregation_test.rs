//! Aggregation Engine Integration Tests
//!
//! Full search cycles over scripted plugins: fault isolation, timeouts,
//! deduplication, ranking fallback and snapshot isolation.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use eventfinder::services::aggregation::{AggregationEngine, AggregationOptions, NO_EVENTS_MESSAGE};
use eventfinder::services::plugins::PluginRegistry;

use crate::support::{event, is_ranking_prompt, Behavior, ScriptedPlugin, ScriptedProvider};

fn engine(registry: &Arc<PluginRegistry>, provider: Arc<ScriptedProvider>) -> AggregationEngine {
    AggregationEngine::new(
        registry.clone(),
        provider,
        AggregationOptions {
            scrape_timeout: Duration::from_millis(200),
            max_results: 10,
        },
    )
}

fn luma_events() -> Vec<eventfinder_core::Event> {
    vec![
        event("AI Meetup", "https://lu.ma/ai-meetup", "2099-05-03", "Luma"),
        event("LLM Hack Night", "https://lu.ma/llm-hack", "2099-05-01", "Luma"),
        event("Agents Demo Day", "https://lu.ma/agents", "2099-05-02", "Luma"),
    ]
}

#[tokio::test]
async fn test_failing_source_does_not_affect_others() {
    let registry = Arc::new(PluginRegistry::new());
    registry
        .upsert(ScriptedPlugin::new("Luma", Behavior::Events(luma_events())).into_descriptor())
        .await;
    registry
        .upsert(
            ScriptedPlugin::new("Eventbrite", Behavior::Fail("layout changed".into()))
                .into_descriptor(),
        )
        .await;
    let provider = ScriptedProvider::replying(
        r#"{"summary": "Three AI events this week.", "picks": [{"index": 1, "reason": "hands-on"}, {"index": 0}, {"index": 2}]}"#,
    );

    let outcome = engine(&registry, provider.clone()).find("AI meetups", &[]).await;

    assert!(outcome.ranked);
    assert_eq!(outcome.explanation, "Three AI events this week.");
    assert_eq!(outcome.events.len(), 3);
    assert!(outcome.events.iter().all(|e| e.event.source == "Luma"));
    assert_eq!(outcome.events[0].event.title, "LLM Hack Night");
    assert_eq!(outcome.events[0].reason.as_deref(), Some("hands-on"));
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].plugin, "Eventbrite");
    assert!(outcome.failures[0].reason.contains("layout changed"));
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_every_source_failing_yields_empty_result() {
    let registry = Arc::new(PluginRegistry::new());
    registry
        .upsert(ScriptedPlugin::new("Broken", Behavior::Fail("boom".into())).into_descriptor())
        .await;
    registry
        .upsert(ScriptedPlugin::new("Stuck", Behavior::Hang).into_descriptor())
        .await;
    registry
        .upsert(ScriptedPlugin::new("Crashy", Behavior::Panic).into_descriptor())
        .await;
    let provider = ScriptedProvider::replying("{}");

    let outcome = engine(&registry, provider.clone()).find("hackathons", &[]).await;

    assert!(outcome.events.is_empty());
    assert_eq!(outcome.explanation, NO_EVENTS_MESSAGE);
    assert!(!outcome.ranked);
    let failed: Vec<&str> = outcome.failures.iter().map(|f| f.plugin.as_str()).collect();
    assert_eq!(failed, vec!["Broken", "Stuck", "Crashy"]);
    assert!(outcome.failures[1].reason.contains("timed out"));
    assert_eq!(outcome.failures[2].reason, "plugin panicked");
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_empty_registry_skips_ranking() {
    let registry = Arc::new(PluginRegistry::new());
    let provider = ScriptedProvider::replying("{}");

    let outcome = engine(&registry, provider.clone()).find("meetups", &[]).await;

    assert!(outcome.events.is_empty());
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.explanation, NO_EVENTS_MESSAGE);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_hanging_source_is_cut_off() {
    let registry = Arc::new(PluginRegistry::new());
    registry
        .upsert(ScriptedPlugin::new("Stuck", Behavior::Hang).into_descriptor())
        .await;
    registry
        .upsert(ScriptedPlugin::new("Luma", Behavior::Events(luma_events())).into_descriptor())
        .await;
    let provider = ScriptedProvider::failing();

    let started = std::time::Instant::now();
    let outcome = engine(&registry, provider).find("meetups", &[]).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(outcome.events.len(), 3);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].plugin, "Stuck");
}

#[tokio::test]
async fn test_duplicate_urls_keep_first_seen() {
    let registry = Arc::new(PluginRegistry::new());
    registry
        .upsert(
            ScriptedPlugin::new(
                "Luma",
                Behavior::Events(vec![event("Hack Night", "https://a.com/1", "2025-05-01", "Luma")]),
            )
            .into_descriptor(),
        )
        .await;
    registry
        .upsert(
            ScriptedPlugin::new(
                "Mirror",
                Behavior::Events(vec![event("HACK NIGHT", "https://a.com/1", "2025-05-01", "Mirror")]),
            )
            .into_descriptor(),
        )
        .await;
    let provider = ScriptedProvider::failing();

    let outcome = engine(&registry, provider).find("hack nights", &[]).await;

    assert_eq!(outcome.events.len(), 1);
    assert_eq!(outcome.events[0].event.title, "Hack Night");
    assert_eq!(outcome.events[0].event.source, "Luma");
}

#[tokio::test]
async fn test_ranking_failure_falls_back_to_date_order() {
    let registry = Arc::new(PluginRegistry::new());
    registry
        .upsert(ScriptedPlugin::new("Luma", Behavior::Events(luma_events())).into_descriptor())
        .await;
    let provider = ScriptedProvider::failing();

    let outcome = AggregationEngine::new(
        registry.clone(),
        provider.clone(),
        AggregationOptions {
            scrape_timeout: Duration::from_secs(5),
            max_results: 2,
        },
    )
    .find("AI meetups", &[])
    .await;

    assert!(!outcome.ranked);
    assert!(!outcome.explanation.is_empty());
    let titles: Vec<&str> = outcome.events.iter().map(|e| e.event.title.as_str()).collect();
    assert_eq!(titles, vec!["LLM Hack Night", "Agents Demo Day"]);
    assert!(outcome.events.iter().all(|e| e.reason.is_none()));
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_non_json_ranking_reply_falls_back_to_date_order() {
    let registry = Arc::new(PluginRegistry::new());
    registry
        .upsert(ScriptedPlugin::new("Luma", Behavior::Events(luma_events())).into_descriptor())
        .await;
    let provider = ScriptedProvider::replying("Here are some great events for you!");

    let outcome = engine(&registry, provider).find("AI meetups", &[]).await;

    assert!(!outcome.ranked);
    assert_eq!(outcome.events.len(), 3);
    assert_eq!(outcome.events[0].event.title, "LLM Hack Night");
}

#[tokio::test]
async fn test_ranking_sees_history_and_interest() {
    let registry = Arc::new(PluginRegistry::new());
    registry
        .upsert(ScriptedPlugin::new("Luma", Behavior::Events(luma_events())).into_descriptor())
        .await;
    let provider = ScriptedProvider::replying(r#"{"summary": "ok", "picks": [{"index": 0}]}"#);
    let history = vec![
        eventfinder_llm::Message::user("I like AI"),
        eventfinder_llm::Message::assistant("Noted!"),
    ];

    engine(&registry, provider.clone()).find("anything this week?", &history).await;

    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    assert!(is_ranking_prompt(&calls[0].system));
    assert!(calls[0].system.contains("LLM Hack Night"));
    assert_eq!(calls[0].messages.len(), 3);
    assert_eq!(calls[0].messages[2].content, "anything this week?");
}

#[tokio::test]
async fn test_plugin_registered_mid_cycle_joins_next_cycle() {
    let registry = Arc::new(PluginRegistry::new());
    let late = ScriptedPlugin::new(
        "Late",
        Behavior::Events(vec![event("Late Show", "https://late.example.com/1", "2099-01-01", "Late")]),
    );
    let late_scrapes = late.scrape_counter();
    registry
        .upsert(
            ScriptedPlugin::new(
                "Gate",
                Behavior::RegisterDuring {
                    registry: registry.clone(),
                    plugin: late.into_descriptor(),
                    events: vec![event("Gate Talk", "https://gate.example.com/1", "2099-01-02", "Gate")],
                },
            )
            .into_descriptor(),
        )
        .await;
    let provider = ScriptedProvider::failing();
    let engine = engine(&registry, provider);

    let first = engine.find("events", &[]).await;
    assert_eq!(first.events.len(), 1);
    assert_eq!(first.events[0].event.source, "Gate");
    assert_eq!(late_scrapes.load(Ordering::SeqCst), 0);

    let second = engine.find("events", &[]).await;
    let sources: Vec<&str> = second.events.iter().map(|e| e.event.source.as_str()).collect();
    assert_eq!(sources, vec!["Late", "Gate"]);
    assert_eq!(late_scrapes.load(Ordering::SeqCst), 1);
}
