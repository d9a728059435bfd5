//! Plugin Registry
//!
//! In-memory catalog of active plugins, keyed by name. Reads hand out
//! snapshots; writes replace whole entries under the write lock, so a reader
//! never observes a half-registered plugin.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::services::plugins::models::{PluginDescriptor, PluginInfo, UpsertOutcome};

/// Immutable view of the registry at one instant.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    entries: Vec<Arc<PluginDescriptor>>,
}

impl RegistrySnapshot {
    pub fn iter(&self) -> impl Iterator<Item = &Arc<PluginDescriptor>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|d| d.name.clone()).collect()
    }
}

impl IntoIterator for RegistrySnapshot {
    type Item = Arc<PluginDescriptor>;
    type IntoIter = std::vec::IntoIter<Arc<PluginDescriptor>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Catalog of active plugins in registration order.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    entries: RwLock<IndexMap<String, Arc<PluginDescriptor>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata of every active plugin, in registration order.
    pub async fn list(&self) -> Vec<PluginInfo> {
        self.entries.read().await.values().map(|d| d.info()).collect()
    }

    pub async fn get(&self, name: &str) -> Option<Arc<PluginDescriptor>> {
        self.entries.read().await.get(name).cloned()
    }

    /// Insert or replace the entry for `descriptor.name`.
    ///
    /// A replaced entry keeps its position in the listing order.
    pub async fn upsert(&self, descriptor: Arc<PluginDescriptor>) -> UpsertOutcome {
        let name = descriptor.name.clone();
        let previous = self.entries.write().await.insert(name.clone(), descriptor);
        match previous {
            Some(_) => {
                tracing::info!("[plugins] Replaced plugin '{}'", name);
                UpsertOutcome::Replaced
            }
            None => {
                tracing::info!("[plugins] Registered plugin '{}'", name);
                UpsertOutcome::Inserted
            }
        }
    }

    pub async fn remove(&self, name: &str) -> Option<Arc<PluginDescriptor>> {
        let removed = self.entries.write().await.shift_remove(name);
        if removed.is_some() {
            tracing::info!("[plugins] Removed plugin '{}'", name);
        }
        removed
    }

    /// Copy of the current entry set; later writes do not affect it.
    pub async fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            entries: self.entries.read().await.values().cloned().collect(),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn names(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }
}
