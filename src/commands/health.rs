//! Health Check Commands
//!
//! Reports service status and the number of active plugins.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::models::response::HealthResponse;
use crate::state::AppState;

/// `GET /api/health`
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.registry().len().await))
}
