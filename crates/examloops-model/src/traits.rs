use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::ModelOutput;

/// Errors that can occur while calling a reasoning backend
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Model request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse model response: {0}")]
    Parse(String),

    #[error("Model returned an empty response")]
    EmptyResponse,
}

impl ModelError {
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ModelError::Timeout(timeout)
        } else {
            ModelError::Http(err.to_string())
        }
    }
}

/// Configuration for a single completion request
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model name understood by the backend
    pub model: String,
    pub temperature: f32,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "deepseek-chat".to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(120),
        }
    }
}

impl ModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A chat message sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user" or "assistant"
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Supported backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBinding {
    DeepSeek,
    DashScope,
}

impl ModelBinding {
    /// Model used when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            ModelBinding::DeepSeek => "deepseek-chat",
            ModelBinding::DashScope => "qwen-plus",
        }
    }
}

impl std::fmt::Display for ModelBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelBinding::DeepSeek => write!(f, "deepseek"),
            ModelBinding::DashScope => write!(f, "dashscope"),
        }
    }
}

impl std::str::FromStr for ModelBinding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deepseek" | "openai" => Ok(ModelBinding::DeepSeek),
            "dashscope" | "qwen" => Ok(ModelBinding::DashScope),
            _ => Err(format!("Unknown model binding: {}", s)),
        }
    }
}

/// The external reasoning capability used by the judge and the corrector
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    fn binding(&self) -> ModelBinding;

    /// Run a chat completion and return the assistant's text
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &ModelConfig,
    ) -> Result<ModelOutput, ModelError>;

    /// Whether the backend has the credentials it needs
    fn is_available(&self) -> bool;
}
