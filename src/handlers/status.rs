// src/handlers/status.rs
use crate::AppState;
use axum::{extract::Extension, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn status_routes() -> Router {
    Router::new().route("/api/status", get(api_status))
}

/// GET /api/status - Relay health and active policy
pub async fn api_status(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let config = &state.config;

    Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "variant": config.variant,
        "provider": state.provider.name(),
        "default_model": config.default_model,
        "shortcut_enabled": config.shortcut_enabled,
        "cors_origins": config.allowed_origins.len(),
    }))
}
