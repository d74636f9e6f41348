use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::http::post_json;
use crate::{ChatMessage, ChatModel, Credentials, ModelBinding, ModelConfig, ModelError, ModelOutput};

const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";

/// DeepSeek backend speaking the OpenAI-compatible chat completions API
pub struct DeepSeekModel {
    client: reqwest::Client,
    credentials: Credentials,
}

impl DeepSeekModel {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
        }
    }

    fn endpoint(&self) -> String {
        let base = self
            .credentials
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!("{}/chat/completions", base)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatModel for DeepSeekModel {
    fn name(&self) -> &str {
        "DeepSeek"
    }

    fn binding(&self) -> ModelBinding {
        ModelBinding::DeepSeek
    }

    fn is_available(&self) -> bool {
        !self.credentials.api_key.is_empty()
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &ModelConfig,
    ) -> Result<ModelOutput, ModelError> {
        debug!(
            backend = self.name(),
            model = %config.model,
            messages = messages.len(),
            "Executing chat completion"
        );

        let start = Instant::now();
        let request = ChatCompletionRequest {
            model: &config.model,
            messages,
            temperature: config.temperature,
            stream: false,
        };

        let response: ChatCompletionResponse = post_json(
            &self.client,
            &self.endpoint(),
            &self.credentials.api_key,
            &request,
            config.timeout,
        )
        .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ModelError::EmptyResponse)?;

        let model = if response.model.is_empty() {
            config.model.clone()
        } else {
            response.model
        };

        Ok(ModelOutput::new(content, model, start.elapsed()))
    }
}
