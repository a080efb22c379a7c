// lib.rs - Chat relay library: configuration, provider client, and HTTP surface
pub mod config;
pub mod handlers;
pub mod intent;
pub mod middleware;
pub mod models;
pub mod openai_client;

use axum::{Extension, Router};
use std::sync::Arc;

pub use config::{RelayConfig, RelayVariant, SamplingOptions, Settings};
pub use intent::is_create_file_intent;
pub use openai_client::{CompletionProvider, OpenAiClient, ProviderError};

// Process-wide state: the relay policy and the provider client, both fixed at startup
pub struct AppState {
    pub config: RelayConfig,
    pub provider: Arc<dyn CompletionProvider>,
}

impl AppState {
    pub fn new(config: RelayConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        Self { config, provider }
    }
}

/// Builds the router with every route, the logging middleware, and the shared state.
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(handlers::chat::chat_routes(&state.config))
        .merge(handlers::status::status_routes())
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(Extension(state))
}
