mod dashscope;
mod deepseek;
mod http;
mod output;
mod traits;

pub use dashscope::DashScopeModel;
pub use deepseek::DeepSeekModel;
pub use output::ModelOutput;
pub use traits::{ChatMessage, ChatModel, ModelBinding, ModelConfig, ModelError};

/// Connection settings shared by every backend
#[derive(Clone, Default)]
pub struct Credentials {
    pub api_key: String,
    /// Overrides the backend's default endpoint when set
    pub base_url: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Create a backend by binding
pub fn create_model(binding: ModelBinding, credentials: Credentials) -> Box<dyn ChatModel> {
    match binding {
        ModelBinding::DeepSeek => Box::new(DeepSeekModel::new(credentials)),
        ModelBinding::DashScope => Box::new(DashScopeModel::new(credentials)),
    }
}
