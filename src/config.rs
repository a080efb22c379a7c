// src/config.rs
//! Relay policy and server settings, read once at startup.

use serde::Serialize;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const GENERAL_DEFAULT_MODEL: &str = "gpt-4";
pub const SHORTCUT_DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const SHORTCUT_DEFAULT_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY not found in environment")]
    MissingApiKey,
    #[error("Unknown relay variant '{0}' (expected 'general' or 'shortcut')")]
    UnknownVariant(String),
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

/// Which of the two endpoint policies the process runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayVariant {
    /// Per-request model override, fixed sampling limits, error details surfaced.
    General,
    /// "create file" shortcut, CORS allow-list, fixed model, generic errors.
    Shortcut,
}

impl RelayVariant {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "general" | "a" => Ok(RelayVariant::General),
            "shortcut" | "b" => Ok(RelayVariant::Shortcut),
            _ => Err(ConfigError::UnknownVariant(value.to_string())),
        }
    }
}

/// Sampling options sent with every provider call. `None` leaves the provider default.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SamplingOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub variant: RelayVariant,
    pub shortcut_enabled: bool,
    /// Honour the `model` field of the request body.
    pub allow_model_override: bool,
    /// Forward only `{role, content}` of each inbound message.
    pub strip_message_fields: bool,
    /// Include the failure text as `details` in 500 responses.
    pub expose_error_details: bool,
    pub default_model: String,
    pub sampling: SamplingOptions,
    pub allowed_origins: Vec<String>,
}

impl RelayConfig {
    pub fn general() -> Self {
        Self {
            variant: RelayVariant::General,
            shortcut_enabled: false,
            allow_model_override: true,
            strip_message_fields: false,
            expose_error_details: true,
            default_model: GENERAL_DEFAULT_MODEL.to_string(),
            sampling: SamplingOptions {
                temperature: Some(0.7),
                max_tokens: Some(1000),
            },
            allowed_origins: Vec::new(),
        }
    }

    pub fn shortcut() -> Self {
        Self {
            variant: RelayVariant::Shortcut,
            shortcut_enabled: true,
            allow_model_override: false,
            strip_message_fields: true,
            expose_error_details: false,
            default_model: SHORTCUT_DEFAULT_MODEL.to_string(),
            sampling: SamplingOptions::default(),
            allowed_origins: SHORTCUT_DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }

    pub fn for_variant(variant: RelayVariant) -> Self {
        match variant {
            RelayVariant::General => Self::general(),
            RelayVariant::Shortcut => Self::shortcut(),
        }
    }

    /// The model sent to the provider for a request that carried `requested`.
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        match requested {
            Some(model) if self.allow_model_override && !model.is_empty() => model.to_string(),
            _ => self.default_model.clone(),
        }
    }

    /// The credential is checked at startup only for the general variant;
    /// the shortcut variant defers the failure to the first provider call.
    pub fn requires_api_key(&self) -> bool {
        self.variant == RelayVariant::General
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub relay: RelayConfig,
    pub provider: ProviderSettings,
    pub bind_addr: SocketAddr,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let variant = match get("CHAT_RELAY_VARIANT") {
            Some(value) => RelayVariant::parse(&value)?,
            None => RelayVariant::General,
        };
        let mut relay = RelayConfig::for_variant(variant);

        if let Some(model) = get("CHAT_DEFAULT_MODEL") {
            relay.default_model = model;
        }
        if let Some(origins) = get("CHAT_ALLOWED_ORIGINS") {
            relay.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }

        let api_key = get("OPENAI_API_KEY");
        if api_key.is_none() && relay.requires_api_key() {
            return Err(ConfigError::MissingApiKey);
        }

        let timeout = match get("CHAT_PROVIDER_TIMEOUT_SECS") {
            Some(value) => Some(Duration::from_secs(value.parse().map_err(|_| {
                ConfigError::InvalidValue {
                    name: "CHAT_PROVIDER_TIMEOUT_SECS",
                    value: value.clone(),
                }
            })?)),
            None => None,
        };

        let provider = ProviderSettings {
            api_key,
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout,
        };

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = get("PORT").unwrap_or_else(|| "3000".to_string());
        let bind_addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                name: "HOST/PORT",
                value: format!("{}:{}", host, port),
            })?;

        Ok(Self {
            relay,
            provider,
            bind_addr,
        })
    }
}
