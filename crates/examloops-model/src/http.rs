use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ModelError;

/// Error body shape shared by OpenAI-compatible and DashScope endpoints
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorDetail>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// POST a JSON body with bearer auth and decode the JSON reply
pub(crate) async fn post_json<B, R>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &B,
    timeout: Duration,
) -> Result<R, ModelError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    debug!(url, timeout_secs = timeout.as_secs_f64(), "Sending model request");

    let response = client
        .post(url)
        .bearer_auth(api_key)
        .timeout(timeout)
        .json(body)
        .send()
        .await
        .map_err(|e| ModelError::from_reqwest(e, timeout))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ModelError::from_reqwest(e, timeout))?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.error.map(|e| e.message).or(b.message))
            .unwrap_or(text);
        return Err(ModelError::Api {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&text).map_err(|e| ModelError::Parse(e.to_string()))
}
