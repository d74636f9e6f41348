use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::http::post_json;
use crate::{ChatMessage, ChatModel, Credentials, ModelBinding, ModelConfig, ModelError, ModelOutput};

const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com";
const GENERATION_PATH: &str = "/api/v1/services/aigc/text-generation/generation";

/// Alibaba DashScope backend using the native text-generation API
pub struct DashScopeModel {
    client: reqwest::Client,
    credentials: Credentials,
}

impl DashScopeModel {
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
        format!("{}{}", base, GENERATION_PATH)
    }
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    input: GenerationInput<'a>,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationInput<'a> {
    messages: &'a [ChatMessage],
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    result_format: &'static str,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    output: GenerationOutput,
}

#[derive(Debug, Deserialize)]
struct GenerationOutput {
    #[serde(default)]
    choices: Vec<Choice>,
    /// Populated instead of `choices` when `result_format` is "text"
    #[serde(default)]
    text: Option<String>,
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
impl ChatModel for DashScopeModel {
    fn name(&self) -> &str {
        "DashScope"
    }

    fn binding(&self) -> ModelBinding {
        ModelBinding::DashScope
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
            "Executing text generation"
        );

        let start = Instant::now();
        let request = GenerationRequest {
            model: &config.model,
            input: GenerationInput { messages },
            parameters: GenerationParameters {
                result_format: "message",
                temperature: config.temperature,
            },
        };

        let response: GenerationResponse = post_json(
            &self.client,
            &self.endpoint(),
            &self.credentials.api_key,
            &request,
            config.timeout,
        )
        .await?;

        let output = response.output;
        let content = output
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .or(output.text)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ModelError::EmptyResponse)?;

        Ok(ModelOutput::new(content, config.model.clone(), start.elapsed()))
    }
}
