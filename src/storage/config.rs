//! Configuration File
//!
//! `config.json` under `~/.eventfinder` (or a path given on the command line).
//! A missing file is created with defaults; an invalid one is an error.

use std::fs;
use std::path::{Path, PathBuf};

use eventfinder_llm::ProviderConfig;

use crate::models::settings::{AppConfig, SettingsUpdate};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, ensure_dir, plugins_dir};

#[derive(Debug)]
pub struct ConfigService {
    path: PathBuf,
    config: AppConfig,
}

fn read_config(path: &Path) -> AppResult<AppConfig> {
    let config: AppConfig = serde_json::from_str(&fs::read_to_string(path)?)?;
    config.validate().map_err(AppError::validation)?;
    Ok(config)
}

fn write_config(path: &Path, config: &AppConfig) -> AppResult<()> {
    config.validate().map_err(AppError::validation)?;
    fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

impl ConfigService {
    /// Open the default `~/.eventfinder/config.json`.
    pub fn new() -> AppResult<Self> {
        Self::open(config_path()?)
    }

    pub fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }

        let config = if path.exists() {
            read_config(&path)?
        } else {
            let config = AppConfig::default();
            write_config(&path, &config)?;
            tracing::info!("[config] Wrote default configuration to {}", path.display());
            config
        };

        Ok(Self { path, config })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Owned copy for handing to the application state.
    pub fn snapshot(&self) -> AppConfig {
        self.config.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `update`, validate the result and persist it.
    ///
    /// On any error the in-memory configuration is left as it was.
    pub fn update(&mut self, update: SettingsUpdate) -> AppResult<&AppConfig> {
        let mut candidate = self.config.clone();
        candidate.apply_update(update);
        write_config(&self.path, &candidate)?;
        self.config = candidate;
        Ok(&self.config)
    }

    /// Re-read the file, discarding in-memory changes.
    pub fn reload(&mut self) -> AppResult<()> {
        self.config = read_config(&self.path)?;
        Ok(())
    }

    /// Configured plugin directory, or `~/.eventfinder/plugins`.
    pub fn plugins_dir(&self) -> AppResult<PathBuf> {
        self.config
            .plugins_dir
            .clone()
            .map_or_else(plugins_dir, Ok)
    }

    /// Provider settings with the API key taken from the environment.
    pub fn provider_config(&self) -> ProviderConfig {
        let mut provider = self.config.provider.clone();
        let var = provider.provider.api_key_env();
        provider.api_key = std::env::var(var).ok().filter(|k| !k.trim().is_empty());
        if provider.api_key.is_none() {
            tracing::warn!(
                "[config] {} is not set; chat and ranking will report the missing key",
                var
            );
        }
        provider
    }
}
