//! HTTP Commands
//!
//! Axum handlers for the JSON API. Handlers are thin: they unpack the
//! request, call a service and wrap the result.

pub mod chat;
pub mod health;
pub mod plugins;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::state::AppState;

pub use chat::*;
pub use health::*;
pub use plugins::*;

/// Build the `/api` router with CORS for the configured origins.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config().allowed_origins);

    Router::new()
        .route("/api/health", get(get_health))
        .route("/api/chat", post(post_chat))
        .route("/api/plugins", get(list_plugins))
        .route("/api/plugins/reload", post(reload_plugins))
        .route(
            "/api/conversations/{id}",
            get(get_conversation).delete(delete_conversation),
        )
        .layer(cors)
        .with_state(state)
}

/// CORS layer for `origins`; entries that are not valid header values are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = parse_origins(origins);
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("[api] Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect()
}
