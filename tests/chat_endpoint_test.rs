//! End-to-end tests for `POST /chat` under both relay policies.

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    Router,
};
use chat_relay::openai_client::{ChatCompletion, CompletionRequest};
use chat_relay::{build_app, AppState, CompletionProvider, ProviderError, RelayConfig};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Records every call and answers with a fixed outcome.
struct StubProvider {
    outcome: Result<Value, String>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl StubProvider {
    fn replying(content: &str) -> Arc<Self> {
        Self::with_choices(json!([{"message": {"role": "assistant", "content": content}}]))
    }

    fn with_choices(choices: Value) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(json!({ "choices": choices })),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for StubProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<ChatCompletion, ProviderError> {
        self.calls.lock().unwrap().push(request);
        match &self.outcome {
            Ok(body) => Ok(serde_json::from_value(body.clone())?),
            Err(message) => Err(ProviderError::Api {
                status: 429,
                message: message.clone(),
            }),
        }
    }

    fn name(&self) -> &str {
        "stub"
    }
}

fn app(config: RelayConfig, provider: Arc<StubProvider>) -> Router {
    build_app(Arc::new(AppState::new(config, provider)))
}

async fn send(app: &Router, request: Request) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

fn post_chat(body: &str) -> Request {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json(body: Value) -> Request {
    post_chat(&body.to_string())
}

mod general {
    use super::*;

    #[tokio::test]
    async fn test_relays_reply_without_files() {
        let provider = StubProvider::replying("hi there");
        let app = app(RelayConfig::general(), provider.clone());

        let (status, _, body) = send(
            &app,
            post_json(json!({"messages": [{"role": "user", "content": "hello"}], "model": "gpt-4"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"content": "hi there"}));

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, "gpt-4");
        assert_eq!(calls[0].temperature, Some(0.7));
        assert_eq!(calls[0].max_tokens, Some(1000));
        assert_eq!(calls[0].messages, vec![json!({"role": "user", "content": "hello"})]);
    }

    #[tokio::test]
    async fn test_invalid_messages_never_reach_provider() {
        let provider = StubProvider::replying("unused");
        let app = app(RelayConfig::general(), provider.clone());

        for body in [
            r#"{"messages":"not-an-array"}"#,
            r#"{"model":"gpt-4"}"#,
            r#"{"messages":{"role":"user"}}"#,
            r#"[]"#,
            "not json",
        ] {
            let (status, _, response) = send(&app, post_chat(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
            assert_eq!(response, json!({"error": "invalid message format"}));
        }
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_model_defaults_and_override() {
        let provider = StubProvider::replying("ok");
        let app = app(RelayConfig::general(), provider.clone());
        let messages = json!([{"role": "user", "content": "hello"}]);

        send(&app, post_json(json!({"messages": messages}))).await;
        send(&app, post_json(json!({"messages": messages, "model": "gpt-4o-mini"}))).await;

        let calls = provider.calls();
        assert_eq!(calls[0].model, "gpt-4");
        assert_eq!(calls[1].model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_files_and_messages_pass_through() {
        let provider = StubProvider::replying("done");
        let app = app(RelayConfig::general(), provider.clone());
        let messages = json!([
            {"role": "user", "content": "one", "id": "m1"},
            {"role": "assistant", "content": ""},
            {"role": "user", "content": "создай файл"}
        ]);
        let files = json!(["notes/a.txt", "b.md", "b.md"]);

        let (status, _, body) = send(&app, post_json(json!({"messages": messages, "files": files}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"content": "done", "files": files}));
        // no shortcut and no stripping under the general policy
        assert_eq!(Value::Array(provider.calls()[0].messages.clone()), messages);
    }

    #[tokio::test]
    async fn test_empty_message_list_is_forwarded() {
        let provider = StubProvider::replying("ok");
        let app = app(RelayConfig::general(), provider.clone());

        let (status, _, _) = send(&app, post_json(json!({"messages": []}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_null_content_is_propagated() {
        let provider = StubProvider::with_choices(json!([{"message": {"role": "assistant", "content": null}}]));
        let app = app(RelayConfig::general(), provider);

        let (status, _, body) = send(&app, post_json(json!({"messages": [], "files": []}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"content": null, "files": []}));
    }

    #[tokio::test]
    async fn test_provider_failure_surfaces_details() {
        let app = app(RelayConfig::general(), StubProvider::failing("rate limited"));

        let (status, _, body) = send(&app, post_json(json!({"messages": [{"role": "user", "content": "hi"}]}))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "internal server error", "details": "rate limited"}));
    }

    #[tokio::test]
    async fn test_empty_choice_list_is_a_failure() {
        let app = app(RelayConfig::general(), StubProvider::with_choices(json!([])));

        let (status, _, body) = send(&app, post_json(json!({"messages": []}))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["details"], "Provider response contained no choices");
    }

    #[tokio::test]
    async fn test_no_cors_headers() {
        let app = app(RelayConfig::general(), StubProvider::replying("ok"));
        let mut request = post_json(json!({"messages": []}));
        request
            .headers_mut()
            .insert(header::ORIGIN, "http://localhost:3000".parse().unwrap());

        let (status, headers, _) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}

mod shortcut {
    use super::*;

    fn shortcut_payload() -> Value {
        json!({
            "role": "assistant",
            "content": "Файл test.txt создан.",
            "action": "create_file",
            "filename": "test.txt",
            "fileContent": "Привет, мир!"
        })
    }

    #[tokio::test]
    async fn test_trigger_phrase_skips_provider() {
        let provider = StubProvider::replying("unused");
        let app = app(RelayConfig::shortcut(), provider.clone());

        for content in ["пожалуйста, создай файл", "СОЗДАЙ ФАЙЛ notes.txt"] {
            let (status, _, body) = send(
                &app,
                post_json(json!({"messages": [
                    {"role": "assistant", "content": "Чем помочь?"},
                    {"role": "user", "content": content}
                ]})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, shortcut_payload());
        }
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_only_last_message_is_inspected() {
        let provider = StubProvider::replying("hi there");
        let app = app(RelayConfig::shortcut(), provider.clone());

        let (status, _, body) = send(
            &app,
            post_json(json!({
                "model": "gpt-4o",
                "messages": [
                    {"role": "user", "content": "создай файл", "id": 7},
                    {"role": "assistant", "content": "Файл test.txt создан.", "action": "create_file"},
                    {"role": "user", "content": "thanks"}
                ]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"role": "assistant", "content": "hi there"}));

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, "gpt-3.5-turbo");
        assert_eq!(calls[0].temperature, None);
        assert_eq!(calls[0].max_tokens, None);
        assert_eq!(
            calls[0].messages,
            vec![
                json!({"role": "user", "content": "создай файл"}),
                json!({"role": "assistant", "content": "Файл test.txt создан."}),
                json!({"role": "user", "content": "thanks"}),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_messages_rejected() {
        let provider = StubProvider::replying("unused");
        let app = app(RelayConfig::shortcut(), provider.clone());

        let (status, _, body) = send(&app, post_json(json!({"messages": []}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "invalid message format"}));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_is_generic() {
        let app = app(RelayConfig::shortcut(), StubProvider::failing("rate limited"));

        let (status, _, body) = send(&app, post_json(json!({"messages": [{"role": "user", "content": "hi"}]}))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "internal server error"}));
    }

    #[tokio::test]
    async fn test_cors_allows_listed_origin() {
        let app = app(RelayConfig::shortcut(), StubProvider::replying("ok"));
        let preflight = Request::builder()
            .method("OPTIONS")
            .uri("/chat")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();

        let (status, headers, _) = send(&app, preflight).await;

        assert!(status.is_success());
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:5173");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");
    }

    #[tokio::test]
    async fn test_cors_ignores_unlisted_origin() {
        let app = app(RelayConfig::shortcut(), StubProvider::replying("ok"));
        let mut request = post_json(json!({"messages": [{"role": "user", "content": "hi"}]}));
        request
            .headers_mut()
            .insert(header::ORIGIN, "https://evil.example".parse().unwrap());

        let (_, headers, _) = send(&app, request).await;

        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}

#[tokio::test]
async fn test_status_reports_policy() {
    let app = app(RelayConfig::shortcut(), StubProvider::replying("ok"));
    let request = Request::builder()
        .uri("/api/status")
        .body(Body::empty())
        .unwrap();

    let (status, headers, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers.contains_key("x-request-id"));
    assert_eq!(body["status"], "operational");
    assert_eq!(body["variant"], "shortcut");
    assert_eq!(body["provider"], "stub");
    assert_eq!(body["shortcut_enabled"], true);
}
