//! Plugin Directory Watcher
//!
//! Watches the plugin directory and re-runs [`PluginLoader::reload_all`]
//! whenever a definition file is created, changed or removed. Events are
//! debounced, and one batch triggers at most one reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind, Debouncer};
use tokio::runtime::Handle;

use super::loader::{is_definition_file, PluginLoader};

/// Debounce window for plugin directory events.
const PLUGIN_WATCH_DEBOUNCE_MS: u64 = 500;

/// Reloads plugins when their definitions change on disk.
pub struct PluginWatcher {
    /// Active debounced watcher (None if stopped).
    _watcher: Option<Debouncer<RecommendedWatcher>>,
    dir: PathBuf,
    loader: Arc<PluginLoader>,
}

impl PluginWatcher {
    /// Create a watcher for the loader's directory (not yet started).
    pub fn new(loader: Arc<PluginLoader>) -> Self {
        Self {
            _watcher: None,
            dir: loader.dir().to_path_buf(),
            loader,
        }
    }

    /// Start watching. Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<(), String> {
        let handle = Handle::try_current()
            .map_err(|e| format!("Plugin watcher needs a tokio runtime: {}", e))?;
        let loader = self.loader.clone();

        let mut debouncer = new_debouncer(
            Duration::from_millis(PLUGIN_WATCH_DEBOUNCE_MS),
            move |events: Result<Vec<DebouncedEvent>, notify::Error>| {
                let events = match events {
                    Ok(evts) => evts,
                    Err(e) => {
                        tracing::warn!("[plugins] Watch error: {}", e);
                        return;
                    }
                };

                let changed = events
                    .iter()
                    .filter(|event| event.kind == DebouncedEventKind::Any)
                    .map(|event| event.path.as_path());
                if !touches_definitions(changed) {
                    return;
                }

                let loader = loader.clone();
                handle.spawn(async move {
                    tracing::info!("[plugins] Definition change detected, reloading");
                    loader.reload_all().await;
                });
            },
        )
        .map_err(|e| format!("Failed to create plugin watcher: {}", e))?;

        debouncer
            .watcher()
            .watch(&self.dir, RecursiveMode::NonRecursive)
            .map_err(|e| format!("Failed to watch {}: {}", self.dir.display(), e))?;

        self._watcher = Some(debouncer);
        tracing::info!("[plugins] Watching {}", self.dir.display());
        Ok(())
    }

    /// Stop watching.
    pub fn stop(&mut self) {
        if self._watcher.take().is_some() {
            tracing::info!("[plugins] Stopped watching {}", self.dir.display());
        }
    }

    pub fn is_active(&self) -> bool {
        self._watcher.is_some()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl std::fmt::Debug for PluginWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginWatcher")
            .field("dir", &self.dir)
            .field("has_watcher", &self._watcher.is_some())
            .finish()
    }
}

/// Whether a debounced batch includes a definition file.
fn touches_definitions<'a>(mut paths: impl Iterator<Item = &'a Path>) -> bool {
    paths.any(is_definition_file)
}
