//! Plugin Loader
//!
//! Discovers `*.toml` definitions in the plugin directory, validates them,
//! resolves their scraper kind and registers the resulting plugins.
//!
//! A definition that fails never takes the others down with it: failures are
//! collected into the [`DiscoveryReport`] and logged. Loader operations are
//! serialized so a watcher-triggered reload and a generator-triggered
//! `load_one` never interleave.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use eventfinder_core::PluginContext;

use crate::services::plugins::definition::PluginDefinition;
use crate::services::plugins::models::{DiscoveryReport, LoadFailure, PluginDescriptor};
use crate::services::plugins::registry::PluginRegistry;
use crate::services::plugins::scrapers::ScraperFactories;

/// Extension of plugin definition files
pub const DEFINITION_EXTENSION: &str = "toml";

/// Loads definitions from one directory into a registry.
pub struct PluginLoader {
    dir: PathBuf,
    registry: Arc<PluginRegistry>,
    factories: Arc<ScraperFactories>,
    context: PluginContext,
    op_lock: Mutex<()>,
}

impl PluginLoader {
    pub fn new(
        dir: impl Into<PathBuf>,
        registry: Arc<PluginRegistry>,
        factories: Arc<ScraperFactories>,
        context: PluginContext,
    ) -> Self {
        Self {
            dir: dir.into(),
            registry,
            factories,
            context,
            op_lock: Mutex::new(()),
        }
    }

    /// The plugin source directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Load every definition in the directory.
    ///
    /// Creates the directory when it does not exist yet.
    pub async fn discover(&self) -> DiscoveryReport {
        let _guard = self.op_lock.lock().await;
        let report = self.discover_locked().await;
        log_report("Discovery", &self.dir, &report);
        report
    }

    /// Load (or reload) a single definition file.
    ///
    /// On failure nothing is registered and any existing entry with the same
    /// name is left untouched.
    pub async fn load_one(&self, path: &Path) -> Result<Arc<PluginDescriptor>, LoadFailure> {
        let _guard = self.op_lock.lock().await;
        self.load_locked(path).await.inspect_err(|failure| {
            tracing::warn!("[plugins] Failed to load {}: {}", path.display(), failure.error);
        })
    }

    /// Re-run discovery and drop entries whose definition vanished or failed.
    pub async fn reload_all(&self) -> DiscoveryReport {
        let _guard = self.op_lock.lock().await;
        let mut report = self.discover_locked().await;

        let loaded: HashSet<&str> = report.loaded.iter().map(String::as_str).collect();
        let stale: Vec<String> = self
            .registry
            .snapshot()
            .await
            .iter()
            .filter(|d| {
                d.definition_path
                    .as_deref()
                    .is_some_and(|p| p.starts_with(&self.dir))
            })
            .filter(|d| !loaded.contains(d.name.as_str()))
            .map(|d| d.name.clone())
            .collect();

        for name in stale {
            if self.registry.remove(&name).await.is_some() {
                report.removed.push(name);
            }
        }

        log_report("Reload", &self.dir, &report);
        report
    }

    async fn discover_locked(&self) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        let paths = match self.definition_files().await {
            Ok(paths) => paths,
            Err(e) => {
                report.failures.push(LoadFailure::new(&self.dir, e));
                return report;
            }
        };

        for path in paths {
            match self.load_locked(&path).await {
                Ok(descriptor) => {
                    if !report.loaded.contains(&descriptor.name) {
                        report.loaded.push(descriptor.name.clone());
                    }
                }
                Err(failure) => {
                    tracing::warn!("[plugins] Skipping {}: {}", failure.definition, failure.error);
                    report.failures.push(failure);
                }
            }
        }

        report
    }

    async fn load_locked(&self, path: &Path) -> Result<Arc<PluginDescriptor>, LoadFailure> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| LoadFailure::new(path, e))?;
        let definition = PluginDefinition::parse(&text).map_err(|e| LoadFailure::new(path, e))?;
        let instance = self
            .factories
            .build(&definition, &self.context)
            .map_err(|e| LoadFailure::new(path, e))?;

        let descriptor = Arc::new(PluginDescriptor::from_definition(instance, path, &text));
        self.registry.upsert(descriptor.clone()).await;
        Ok(descriptor)
    }

    /// Definition files sorted by file name, skipping hidden and temporary files.
    async fn definition_files(&self) -> std::io::Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            tracing::warn!(
                "[plugins] Plugin directory {} does not exist, creating it",
                self.dir.display()
            );
            tokio::fs::create_dir_all(&self.dir).await?;
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_definition_file(&path) && entry.file_type().await?.is_file() {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(paths)
    }
}

impl std::fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLoader")
            .field("dir", &self.dir)
            .field("factories", &self.factories)
            .finish()
    }
}

/// Whether `path` names a definition the loader should pick up.
pub fn is_definition_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !name.starts_with('.')
        && !name.ends_with('~')
        && path.extension().and_then(|e| e.to_str()) == Some(DEFINITION_EXTENSION)
}

fn log_report(pass: &str, dir: &Path, report: &DiscoveryReport) {
    tracing::info!(
        "[plugins] {} of {}: {} loaded, {} failed, {} removed",
        pass,
        dir.display(),
        report.loaded.len(),
        report.failures.len(),
        report.removed.len()
    );
}
