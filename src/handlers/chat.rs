// src/handlers/chat.rs
use crate::config::RelayConfig;
use crate::intent::is_create_file_intent;
use crate::models::chat::{
    ChatRequest, ChatResponse, ErrorResponse, INTERNAL_SERVER_ERROR, INVALID_MESSAGE_FORMAT,
    UNKNOWN_ERROR,
};
use crate::openai_client::{CompletionRequest, ProviderError};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::Extension,
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

#[derive(Debug)]
pub enum ChatError {
    /// `messages` missing, not an array, or (with the shortcut enabled) empty.
    InvalidMessageFormat,
    Internal { details: Option<String> },
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ChatError::InvalidMessageFormat => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: INVALID_MESSAGE_FORMAT.to_string(),
                    details: None,
                },
            ),
            ChatError::Internal { details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: INTERNAL_SERVER_ERROR.to_string(),
                    details,
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

pub fn chat_routes(config: &RelayConfig) -> Router {
    let routes = Router::new().route("/chat", post(chat_handler));

    match cors_layer(&config.allowed_origins) {
        Some(cors) => routes.layer(cors),
        None => routes,
    }
}

/// Allow-listed origins, `POST` only, credentials allowed. `None` when the list is empty.
pub fn cors_layer(allowed_origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::POST])
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true),
    )
}

/// POST /chat
pub async fn chat_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ChatResponse>, ChatError> {
    let request = parse_request(&body, &state.config)?;
    relay_chat(&state, request).await.map(Json)
}

fn parse_request(body: &[u8], config: &RelayConfig) -> Result<ChatRequest, ChatError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        tracing::warn!("Rejecting chat request with unreadable body: {}", e);
        ChatError::InvalidMessageFormat
    })?;

    let request = ChatRequest::from_json(&value).ok_or_else(|| {
        tracing::warn!("Rejecting chat request: messages missing or not an array");
        ChatError::InvalidMessageFormat
    })?;

    if config.shortcut_enabled && request.messages.is_empty() {
        tracing::warn!("Rejecting chat request: empty message list");
        return Err(ChatError::InvalidMessageFormat);
    }

    Ok(request)
}

/// Runs a validated request through the shortcut check and the provider.
pub async fn relay_chat(state: &AppState, request: ChatRequest) -> Result<ChatResponse, ChatError> {
    let config = &state.config;

    if config.shortcut_enabled
        && request
            .last_message_text()
            .map(is_create_file_intent)
            .unwrap_or(false)
    {
        tracing::info!("📄 Create-file intent detected, answering without the provider");
        return Ok(ChatResponse::create_file());
    }

    let completion_request = CompletionRequest {
        model: config.resolve_model(request.model.as_deref()),
        messages: if config.strip_message_fields {
            request.stripped_messages()
        } else {
            request.messages.clone()
        },
        temperature: config.sampling.temperature,
        max_tokens: config.sampling.max_tokens,
    };

    tracing::info!(
        messages = ?request.messages,
        model = ?request.model,
        files = ?request.files,
        "Sending chat request to {}",
        state.provider.name()
    );

    let reply = state
        .provider
        .complete(completion_request)
        .await
        .and_then(|completion| completion.into_first_message())
        .map_err(|e| provider_failure(config, e))?;

    tracing::info!(role = %reply.role, content = ?reply.content, "Received reply from provider");

    if config.shortcut_enabled {
        Ok(ChatResponse::assistant(reply.content))
    } else {
        Ok(ChatResponse::General {
            content: reply.content,
            files: request.files,
        })
    }
}

fn provider_failure(config: &RelayConfig, error: ProviderError) -> ChatError {
    tracing::error!("❌ Chat request failed: {}", error);

    let details = if config.expose_error_details {
        let text = error.to_string();
        Some(if text.is_empty() { UNKNOWN_ERROR.to_string() } else { text })
    } else {
        None
    };

    ChatError::Internal { details }
}
