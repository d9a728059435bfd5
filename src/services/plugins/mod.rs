//! Plugin System
//!
//! Event sources are plugins described by TOML definition files in a plugin
//! directory. Each definition names a scraper kind that turns it into an
//! in-process [`ScraperPlugin`](eventfinder_core::ScraperPlugin).
//!
//! Architecture:
//! - models.rs:      Data types (PluginDescriptor, PluginInfo, DiscoveryReport, etc.)
//! - definition.rs:  Definition file format and metadata validation
//! - scrapers/:      Scraper kinds and their factories
//! - registry.rs:    Active plugins, snapshot-on-read
//! - loader.rs:      Discovery, single-file loading and reload
//! - watcher.rs:     Reload on definition changes
//! - generator.rs:   Generate a plugin for a site from its page structure

pub mod definition;
pub mod generator;
pub mod loader;
pub mod models;
pub mod registry;
pub mod scrapers;
pub mod watcher;

pub use definition::{DefinitionError, PluginDefinition};
pub use generator::{
    GenerationOutcome, GenerationStage, GeneratorOptions, PluginGenerator, SmokeTest, TargetSite,
};
pub use loader::PluginLoader;
pub use models::*;
pub use registry::{PluginRegistry, RegistrySnapshot};
pub use scrapers::{ScraperFactories, ScraperFactory};
pub use watcher::PluginWatcher;
