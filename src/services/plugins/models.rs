//! Plugin Data Models
//!
//! ## Key Types
//!
//! - `PluginDescriptor` - a registry entry: metadata, provenance, live instance
//! - `PluginInfo` - the listing projection returned by the API
//! - `UpsertOutcome` - whether a registration inserted or replaced an entry
//! - `LoadFailure` - one definition that could not be loaded, and why
//! - `DiscoveryReport` - what a discovery or reload pass did

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use eventfinder_core::ScraperPlugin;

// ============================================================================
// Registry Entry
// ============================================================================

/// An active plugin as held by the registry.
///
/// Descriptors are immutable; reloading a definition produces a new
/// descriptor that replaces the old one.
#[derive(Clone)]
pub struct PluginDescriptor {
    pub name: String,
    pub source_url: String,
    pub description: String,
    /// Definition file the entry was loaded from (`None` when registered in code)
    pub definition_path: Option<PathBuf>,
    /// SHA-256 of the definition text
    pub checksum: String,
    pub loaded_at: DateTime<Utc>,
    pub instance: Arc<dyn ScraperPlugin>,
}

impl PluginDescriptor {
    /// Describe an instance that was built from a definition file.
    pub fn from_definition(
        instance: Arc<dyn ScraperPlugin>,
        definition_path: &Path,
        definition_text: &str,
    ) -> Self {
        let mut descriptor = Self::from_instance(instance);
        descriptor.definition_path = Some(definition_path.to_path_buf());
        descriptor.checksum = checksum(definition_text);
        descriptor
    }

    /// Describe an instance registered programmatically.
    pub fn from_instance(instance: Arc<dyn ScraperPlugin>) -> Self {
        Self {
            name: instance.name().to_string(),
            source_url: instance.source_url().to_string(),
            description: instance.description().to_string(),
            definition_path: None,
            checksum: String::new(),
            loaded_at: Utc::now(),
            instance,
        }
    }

    /// Listing projection
    pub fn info(&self) -> PluginInfo {
        PluginInfo {
            name: self.name.clone(),
            source_url: self.source_url.clone(),
            description: self.description.clone(),
        }
    }
}

impl std::fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("source_url", &self.source_url)
            .field("definition_path", &self.definition_path)
            .field("checksum", &self.checksum)
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

/// Hex SHA-256 of a definition's text.
pub fn checksum(text: &str) -> String {
    Sha256::digest(text.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Public metadata of an active plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub source_url: String,
    pub description: String,
}

/// Result of a registry upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

// ============================================================================
// Loading Reports
// ============================================================================

/// A definition that failed to load.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{definition}: {error}")]
pub struct LoadFailure {
    /// File name (or path) of the offending definition
    pub definition: String,
    /// Why it was rejected
    pub error: String,
}

impl LoadFailure {
    pub fn new(path: &Path, error: impl std::fmt::Display) -> Self {
        let definition = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            definition,
            error: error.to_string(),
        }
    }
}

/// Outcome of a discovery or reload pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryReport {
    /// Plugin names registered this pass, in load order
    pub loaded: Vec<String>,
    /// Definitions that were rejected
    pub failures: Vec<LoadFailure>,
    /// Plugin names removed because their definition vanished or failed
    pub removed: Vec<String>,
}

impl DiscoveryReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
