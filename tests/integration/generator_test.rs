//! Plugin Generator Integration Tests
//!
//! End-to-end generation into a temporary plugin directory with a map-backed
//! fetcher and a scripted drafting model.

use std::sync::Arc;
use std::time::Duration;

use eventfinder::services::plugins::{
    GenerationOutcome, GenerationStage, GeneratorOptions, PluginGenerator, PluginLoader,
    PluginRegistry, ScraperFactories, SmokeTest,
};
use eventfinder_core::PluginContext;

use crate::support::{is_drafting_prompt, MapFetcher, ScriptedProvider};

const TARGET: &str = "https://example.com/events";

const PAGE: &str = "# Example Events\n\n- [Launch Party](https://example.com/events/launch) Jun 1\n";

/// A drafted definition whose metadata the generator must overwrite.
const FIXED_DRAFT: &str = r#"name = "SomethingElse"
source_url = "https://wrong.example.org"
description = "Events listed on example.com"
tags = ["demo"]

[scraper]
kind = "fixed"

[[scraper.events]]
title = "Example Launch Party"
url = "https://example.com/events/launch"
date = "2099-06-01T18:00:00"
"#;

struct Harness {
    dir: tempfile::TempDir,
    registry: Arc<PluginRegistry>,
    fetcher: Arc<MapFetcher>,
    provider: Arc<ScriptedProvider>,
    generator: PluginGenerator,
}

fn harness(fetcher: Arc<MapFetcher>, provider: Arc<ScriptedProvider>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(PluginRegistry::new());
    let loader = Arc::new(PluginLoader::new(
        dir.path(),
        registry.clone(),
        Arc::new(ScraperFactories::with_defaults()),
        PluginContext::new(fetcher.clone()),
    ));
    let generator = PluginGenerator::new(
        loader,
        fetcher.clone(),
        provider.clone(),
        GeneratorOptions {
            max_page_chars: 8000,
            smoke_test_timeout: Duration::from_secs(5),
        },
    );
    Harness {
        dir,
        registry,
        fetcher,
        provider,
        generator,
    }
}

fn toml_files(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_generation_registers_plugin_named_after_host() {
    let h = harness(
        MapFetcher::with_pages(&[(TARGET, PAGE)]),
        ScriptedProvider::replying(FIXED_DRAFT),
    );

    let outcome = h.generator.generate(TARGET).await;

    let GenerationOutcome::Activated(plugin) = &outcome else {
        panic!("expected activation, got {:?}", outcome);
    };
    assert_eq!(plugin.plugin_name, "ExampleCom");
    assert_eq!(plugin.source_url, TARGET);
    assert_eq!(plugin.path, h.dir.path().join("example_com.toml"));
    assert_eq!(plugin.smoke_test, SmokeTest::Passed { events: 1 });

    let listed = h.registry.list().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "ExampleCom");
    assert_eq!(listed[0].source_url, TARGET);

    let written = std::fs::read_to_string(&plugin.path).unwrap();
    assert!(written.contains("ExampleCom"));
    assert!(!written.contains("SomethingElse"));

    let message = outcome.message();
    assert!(message.starts_with("Successfully created plugin for https://example.com/events!"));
    assert!(message.contains("Found 1 events"));
    assert!(message.contains("example_com.toml"));

    let calls = h.provider.calls();
    assert_eq!(calls.len(), 1);
    assert!(is_drafting_prompt(&calls[0].system));
    assert!(calls[0].system.contains("Launch Party"));
}

#[tokio::test]
async fn test_repeated_generation_replaces_entry() {
    let h = harness(
        MapFetcher::with_pages(&[(TARGET, PAGE)]),
        ScriptedProvider::replying(FIXED_DRAFT),
    );

    assert!(h.generator.generate(TARGET).await.is_activated());
    let first = h.registry.get("ExampleCom").await.unwrap();
    assert!(h.generator.generate(TARGET).await.is_activated());

    assert_eq!(h.registry.names().await, vec!["ExampleCom"]);
    let second = h.registry.get("ExampleCom").await.unwrap();
    assert!(second.loaded_at >= first.loaded_at);
    assert_eq!(toml_files(h.dir.path()), vec!["example_com.toml"]);
}

#[tokio::test]
async fn test_same_site_requests_run_one_at_a_time() {
    let h = harness(
        MapFetcher::slow(&[(TARGET, PAGE)], Duration::from_millis(100)),
        ScriptedProvider::replying(FIXED_DRAFT),
    );

    let (a, b) = tokio::join!(h.generator.generate(TARGET), h.generator.generate(TARGET));

    assert!(a.is_activated());
    assert!(b.is_activated());
    assert_eq!(h.fetcher.call_count(), 2);
    assert_eq!(h.fetcher.peak_in_flight(), 1);
    assert_eq!(h.registry.len().await, 1);
    assert_eq!(toml_files(h.dir.path()), vec!["example_com.toml"]);
}

#[tokio::test]
async fn test_different_sites_generate_concurrently() {
    const OTHER: &str = "https://example.org/events";
    let h = harness(
        MapFetcher::slow(&[(TARGET, PAGE), (OTHER, PAGE)], Duration::from_millis(100)),
        ScriptedProvider::replying(FIXED_DRAFT),
    );

    let (a, b) = tokio::join!(h.generator.generate(TARGET), h.generator.generate(OTHER));

    assert!(a.is_activated());
    assert!(b.is_activated());
    assert_eq!(h.fetcher.peak_in_flight(), 2);
    let mut names = h.registry.names().await;
    names.sort();
    assert_eq!(names, vec!["ExampleCom", "ExampleOrg"]);
    assert_eq!(
        toml_files(h.dir.path()),
        vec!["example_com.toml", "example_org.toml"]
    );
}

#[tokio::test]
async fn test_bare_domain_is_accepted() {
    let h = harness(
        MapFetcher::with_pages(&[("https://example.com/", PAGE)]),
        ScriptedProvider::replying(FIXED_DRAFT),
    );

    let outcome = h.generator.generate("example.com").await;

    assert!(outcome.is_activated(), "{}", outcome.message());
    assert_eq!(h.registry.names().await, vec!["ExampleCom"]);
}

#[tokio::test]
async fn test_fenced_draft_is_accepted() {
    let fenced = format!("```toml\n{}```", FIXED_DRAFT);
    let h = harness(
        MapFetcher::with_pages(&[(TARGET, PAGE)]),
        ScriptedProvider::replying(&fenced),
    );

    assert!(h.generator.generate(TARGET).await.is_activated());
    assert_eq!(h.registry.len().await, 1);
}

#[tokio::test]
async fn test_unreachable_site_fails_before_drafting() {
    let h = harness(MapFetcher::new(), ScriptedProvider::replying(FIXED_DRAFT));

    let outcome = h.generator.generate(TARGET).await;

    let GenerationOutcome::Failed { stage, path, .. } = &outcome else {
        panic!("expected failure");
    };
    assert_eq!(*stage, GenerationStage::Fetching);
    assert!(path.is_none());
    assert!(outcome
        .message()
        .starts_with("Failed to create plugin for https://example.com/events:"));
    assert_eq!(h.fetcher.call_count(), 1);
    assert_eq!(h.provider.call_count(), 0);
    assert!(h.registry.is_empty().await);
    assert!(toml_files(h.dir.path()).is_empty());
}

#[tokio::test]
async fn test_drafting_failure_writes_nothing() {
    let h = harness(
        MapFetcher::with_pages(&[(TARGET, PAGE)]),
        ScriptedProvider::failing(),
    );

    let outcome = h.generator.generate(TARGET).await;

    assert!(matches!(
        outcome,
        GenerationOutcome::Failed {
            stage: GenerationStage::Drafting,
            ..
        }
    ));
    assert!(h.registry.is_empty().await);
    assert!(toml_files(h.dir.path()).is_empty());
}

#[tokio::test]
async fn test_invalid_draft_is_kept_but_not_registered() {
    let draft = FIXED_DRAFT.replace("kind = \"fixed\"", "kind = \"selenium\"");
    let h = harness(
        MapFetcher::with_pages(&[(TARGET, PAGE)]),
        ScriptedProvider::replying(&draft),
    );

    let outcome = h.generator.generate(TARGET).await;

    let GenerationOutcome::Failed { stage, path, .. } = &outcome else {
        panic!("expected failure");
    };
    assert_eq!(*stage, GenerationStage::Validating);
    let path = path.as_ref().unwrap();
    assert!(path.exists());
    assert!(outcome.message().starts_with("Plugin generated but"));
    assert!(outcome.message().contains("`example_com.toml`"));
    assert!(h.registry.is_empty().await);
}

#[tokio::test]
async fn test_zero_event_plugin_still_activates() {
    let draft = r#"name = "x"
source_url = "https://x.example.com"
description = "Events on example.com"

[scraper]
kind = "markdown"
event_pattern = '^\* \[(?P<title>[^\]]+)\]\((?P<url>[^)]+)\)'
"#;
    let h = harness(
        MapFetcher::with_pages(&[(TARGET, PAGE)]),
        ScriptedProvider::replying(draft),
    );

    let outcome = h.generator.generate(TARGET).await;

    let GenerationOutcome::Activated(plugin) = &outcome else {
        panic!("expected activation, got {:?}", outcome);
    };
    assert_eq!(plugin.smoke_test, SmokeTest::Passed { events: 0 });
    assert!(outcome.message().contains("Found 0 events"));
    assert_eq!(h.registry.names().await, vec!["ExampleCom"]);
    // one fetch for drafting, one for the smoke test scrape
    assert_eq!(h.fetcher.call_count(), 2);
}

#[tokio::test]
async fn test_invalid_target_is_rejected() {
    let h = harness(MapFetcher::new(), ScriptedProvider::replying(FIXED_DRAFT));

    let outcome = h.generator.generate("not a url").await;

    assert!(matches!(
        outcome,
        GenerationOutcome::Failed {
            stage: GenerationStage::Requested,
            ..
        }
    ));
    assert_eq!(h.fetcher.call_count(), 0);
}
