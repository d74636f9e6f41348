//! Configuration file support for examloops.
//!
//! Loads `examloops.toml` from the working directory (or an explicit path) and
//! merges it with environment variables and command-line overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use examloops_model::{Credentials, ModelBinding, ModelConfig};

/// The config file name
pub const CONFIG_FILE_NAME: &str = "examloops.toml";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Project-level configuration loaded from `examloops.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub server: ServerSection,
}

/// `[model]` table
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ModelSection {
    /// `deepseek` or `dashscope`
    pub binding: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for ModelSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSection")
            .field("binding", &self.binding)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// `[server]` table
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        Self::load_file(&config_path).map(Some)
    }

    /// Load an explicitly named file. A missing file is an error here.
    pub fn load_file(config_path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(config)
    }
}

/// Values given on the command line; they win over everything else
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub binding: Option<ModelBinding>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub binding: ModelBinding,
    pub credentials: Credentials,
    pub model: ModelConfig,
    /// Per judge/corrector invocation
    pub invocation_timeout: Duration,
    pub host: String,
    pub port: u16,
}

impl Settings {
    /// Merge sources with priority: overrides > file > environment > defaults
    pub fn resolve(
        file: Option<&ProjectConfig>,
        env: impl Fn(&str) -> Option<String>,
        overrides: &Overrides,
    ) -> Result<Self> {
        let empty = ProjectConfig::default();
        let file = file.unwrap_or(&empty);
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let binding = match overrides.binding {
            Some(binding) => binding,
            None => match file.model.binding.clone().or_else(|| env("LLM_BINDING")) {
                Some(raw) => raw
                    .parse::<ModelBinding>()
                    .map_err(anyhow::Error::msg)
                    .context("Invalid model binding")?,
                None => ModelBinding::DeepSeek,
            },
        };

        let model_name = overrides
            .model
            .clone()
            .or_else(|| file.model.model.clone())
            .or_else(|| env("MODEL_NAME"))
            .unwrap_or_else(|| binding.default_model().to_string());

        let timeout_secs = overrides
            .timeout_secs
            .or(file.model.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        let invocation_timeout = Duration::from_secs(timeout_secs);

        let mut model = ModelConfig::new(model_name).with_timeout(invocation_timeout);
        if let Some(temperature) = file.model.temperature {
            model = model.with_temperature(temperature);
        }

        let credentials = Credentials {
            api_key: file
                .model
                .api_key
                .clone()
                .or_else(|| env("API_KEY"))
                .unwrap_or_default(),
            base_url: file.model.base_url.clone().or_else(|| env("BASE_URL")),
        };

        let host = overrides
            .host
            .clone()
            .or_else(|| file.server.host.clone())
            .or_else(|| env("API_SERVER_HOST"))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match overrides.port.or(file.server.port) {
            Some(port) => port,
            None => match env("API_SERVER_PORT") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid API_SERVER_PORT: {}", raw))?,
                None => DEFAULT_PORT,
            },
        };

        Ok(Self {
            binding,
            credentials,
            model,
            invocation_timeout,
            host,
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(ProjectConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_full_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
[model]
binding = "dashscope"
model = "qwen-max"
api_key = "sk-test"
temperature = 0.2
timeout_secs = 30

[server]
host = "127.0.0.1"
port = 9000
"#,
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.model.binding.as_deref(), Some("dashscope"));
        assert_eq!(config.model.timeout_secs, Some(30));
        assert_eq!(config.server.port, Some(9000));
        assert!(!format!("{:?}", config).contains("sk-test"));
    }

    #[test]
    fn test_unknown_field_is_hard_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[model]\nprovider = \"deepseek\"\n",
        )
        .unwrap();

        assert!(ProjectConfig::load(dir.path()).is_err());
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(None, env_from(&[]), &Overrides::default()).unwrap();
        assert_eq!(settings.binding, ModelBinding::DeepSeek);
        assert_eq!(settings.model.model, "deepseek-chat");
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.invocation_timeout, Duration::from_secs(120));
        assert!(settings.credentials.api_key.is_empty());
    }

    #[test]
    fn test_env_fills_gaps() {
        let env = env_from(&[
            ("LLM_BINDING", "dashscope"),
            ("API_KEY", "sk-env"),
            ("BASE_URL", "http://localhost:1234"),
            ("API_SERVER_PORT", "8080"),
        ]);
        let settings = Settings::resolve(None, env, &Overrides::default()).unwrap();
        assert_eq!(settings.binding, ModelBinding::DashScope);
        assert_eq!(settings.model.model, "qwen-plus");
        assert_eq!(settings.credentials.api_key, "sk-env");
        assert_eq!(
            settings.credentials.base_url.as_deref(),
            Some("http://localhost:1234")
        );
        assert_eq!(settings.port, 8080);
    }

    #[test]
    fn test_precedence_cli_over_file_over_env() {
        let file: ProjectConfig = toml::from_str(
            r#"
[model]
model = "file-model"
api_key = "sk-file"

[server]
port = 7000
"#,
        )
        .unwrap();
        let env = env_from(&[
            ("MODEL_NAME", "env-model"),
            ("API_KEY", "sk-env"),
            ("API_SERVER_PORT", "6000"),
        ]);
        let overrides = Overrides {
            model: Some("cli-model".into()),
            ..Default::default()
        };

        let settings = Settings::resolve(Some(&file), env, &overrides).unwrap();
        assert_eq!(settings.model.model, "cli-model");
        assert_eq!(settings.credentials.api_key, "sk-file");
        assert_eq!(settings.port, 7000);
    }

    #[test]
    fn test_invalid_binding_is_rejected() {
        let env = env_from(&[("LLM_BINDING", "ollama")]);
        assert!(Settings::resolve(None, env, &Overrides::default()).is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let overrides = Overrides {
            timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(Settings::resolve(None, env_from(&[]), &overrides).is_err());
    }
}
