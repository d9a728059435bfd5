//! EventFinder Core
//!
//! Foundational types shared by every crate in the EventFinder workspace.
//! This crate has no dependency on application-level code (HTTP transport,
//! LLM providers, configuration, etc.).
//!
//! ## Module Organization
//!
//! - `event` - The normalized `Event` record every scraper produces
//! - `plugin` - The scraper plugin contract (`ScraperPlugin`, `PluginFailure`, `PluginContext`)
//! - `fetch` - The page fetching capability (`PageFetcher`, `FetchError`)
//!
//! ## Design Principles
//!
//! 1. **Small dependency surface** - serde/async-trait/thiserror/chrono only
//! 2. **Trait-based seams** - plugins and capabilities are trait objects so they can be faked in tests
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod event;
pub mod fetch;
pub mod plugin;

// ── Event Record ───────────────────────────────────────────────────────
pub use event::{Event, EventDraft};

// ── Capabilities ───────────────────────────────────────────────────────
pub use fetch::{FetchError, FetchResult, PageFetcher};

// ── Plugin Contract ────────────────────────────────────────────────────
pub use plugin::{PluginContext, PluginFailure, ScrapeResult, ScraperPlugin};
