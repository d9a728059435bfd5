//! Services
//!
//! Business logic services for the application.
//! Services handle the core functionality and are called by commands.

pub mod aggregation;
pub mod chat;
pub mod plugins;
pub mod prompts;

pub use aggregation::{AggregationEngine, AggregationOptions, SearchOutcome};
pub use chat::ChatOrchestrator;
pub use plugins::{PluginGenerator, PluginLoader, PluginRegistry, PluginWatcher};
