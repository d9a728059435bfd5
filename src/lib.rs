//! EventFinder - Rust Backend Library
//!
//! Conversational event discovery over pluggable scraper sources.
//! It includes:
//! - HTTP command handlers for the chat UI
//! - Plugin registry, loader, watcher and generator
//! - Aggregation and ranking engine, conversation orchestrator
//! - Storage layer (JSON config)
//! - Data models and utilities

pub mod commands;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use commands::router;
pub use models::response::*;
pub use models::settings::{AppConfig, IntentConfig, SettingsUpdate};
pub use state::AppState;
pub use utils::error::{AppError, AppResult};
