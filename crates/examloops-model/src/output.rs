use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Text captured from a completed chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOutput {
    /// Assistant message content
    pub content: String,
    /// Model that produced the reply, as reported by the backend
    pub model: String,
    /// Duration of the request
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl ModelOutput {
    pub fn new(content: String, model: String, duration: Duration) -> Self {
        Self {
            content,
            model,
            duration,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
