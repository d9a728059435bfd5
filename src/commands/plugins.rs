//! Plugin Commands
//!
//! Listing and reloading scraper plugins.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::services::plugins::{DiscoveryReport, PluginInfo};
use crate::state::AppState;

/// `GET /api/plugins`
pub async fn list_plugins(State(state): State<Arc<AppState>>) -> Json<Vec<PluginInfo>> {
    Json(state.registry().list().await)
}

/// `POST /api/plugins/reload`
pub async fn reload_plugins(State(state): State<Arc<AppState>>) -> Json<DiscoveryReport> {
    Json(state.loader().reload_all().await)
}
