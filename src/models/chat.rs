// src/models/chat.rs
use serde::Serialize;
use serde_json::{Map, Value};

pub const INVALID_MESSAGE_FORMAT: &str = "invalid message format";
pub const INTERNAL_SERVER_ERROR: &str = "internal server error";
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Inbound body of `POST /chat`.
///
/// Messages are kept as raw JSON objects: the general policy forwards them
/// untouched and `files` is echoed back byte-for-byte, so neither is reshaped here.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<Value>,
    pub model: Option<String>,
    pub files: Option<Value>,
}

impl ChatRequest {
    /// Extracts the request from a JSON body. `None` when the body is not a JSON
    /// object or `messages` is missing or not an array.
    pub fn from_json(body: &Value) -> Option<Self> {
        let object = body.as_object()?;
        let messages = object.get("messages")?.as_array()?.clone();
        let model = object
            .get("model")
            .and_then(Value::as_str)
            .map(str::to_string);
        let files = object.get("files").cloned();

        Some(Self {
            messages,
            model,
            files,
        })
    }

    /// Text content of the newest message, if it has any.
    pub fn last_message_text(&self) -> Option<&str> {
        self.messages.last()?.get("content")?.as_str()
    }

    /// Messages reduced to their `role` and `content` fields.
    pub fn stripped_messages(&self) -> Vec<Value> {
        self.messages.iter().map(strip_message).collect()
    }
}

fn strip_message(message: &Value) -> Value {
    let mut stripped = Map::new();
    for key in ["role", "content"] {
        if let Some(value) = message.get(key) {
            stripped.insert(key.to_string(), value.clone());
        }
    }
    Value::Object(stripped)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ChatResponse {
    /// Provider reply plus the caller's `files`, echoed unchanged.
    General {
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        files: Option<Value>,
    },
    /// Canned reply for the "create file" intent. No file is written.
    CreateFile {
        role: &'static str,
        content: &'static str,
        action: &'static str,
        filename: &'static str,
        #[serde(rename = "fileContent")]
        file_content: &'static str,
    },
    Assistant {
        role: &'static str,
        content: Option<String>,
    },
}

impl ChatResponse {
    pub fn create_file() -> Self {
        ChatResponse::CreateFile {
            role: "assistant",
            content: crate::intent::SHORTCUT_REPLY,
            action: "create_file",
            filename: crate::intent::SHORTCUT_FILENAME,
            file_content: crate::intent::SHORTCUT_FILE_CONTENT,
        }
    }

    pub fn assistant(content: Option<String>) -> Self {
        ChatResponse::Assistant {
            role: "assistant",
            content,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
