//! Cross-Platform Path Utilities
//!
//! Functions for resolving application directories across platforms.
//! Everything lives under ~/.eventfinder/.

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the EventFinder directory (~/.eventfinder/)
pub fn eventfinder_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".eventfinder"))
}

/// Get the config file path (~/.eventfinder/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(eventfinder_dir()?.join("config.json"))
}

/// Get the default plugin directory (~/.eventfinder/plugins/)
pub fn plugins_dir() -> AppResult<PathBuf> {
    Ok(eventfinder_dir()?.join("plugins"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
