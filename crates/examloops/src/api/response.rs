use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use examloops_core::{FailureReason, LoopError, LoopOutcome, RequestValidationError};

/// Body of every API response. `code` is 0 on success and mirrors the HTTP
/// status otherwise.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub code: u16,
    pub message: String,
    pub data: Option<Value>,
}

impl Envelope {
    pub fn ok(data: impl Serialize) -> Json<Self> {
        Json(Self {
            code: 0,
            message: "ok".to_string(),
            data: serde_json::to_value(data).ok(),
        })
    }
}

/// An error response rendered as an [`Envelope`]
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    data: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: None,
        }
    }

    /// A run that ended in `Failed`
    pub fn from_outcome(outcome: &LoopOutcome) -> Self {
        let (status, message) = match outcome {
            LoopOutcome::Failed { reason, error, .. } => (status_for(*reason), error.clone()),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Unexpected outcome: {}", other.status()),
            ),
        };
        Self {
            status,
            message,
            data: serde_json::to_value(outcome).ok(),
        }
    }
}

/// Backend trouble is a bad gateway; cancellation means we are going away
fn status_for(reason: FailureReason) -> StatusCode {
    match reason {
        FailureReason::EvaluationError | FailureReason::CorrectionError => StatusCode::BAD_GATEWAY,
        FailureReason::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl From<RequestValidationError> for ApiError {
    fn from(err: RequestValidationError) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<LoopError> for ApiError {
    fn from(err: LoopError) -> Self {
        let reason = err.failure_reason();
        Self {
            status: status_for(reason),
            message: err.to_string(),
            data: Some(serde_json::json!({
                "status": "failed",
                "reason": reason,
                "cause": err.cause(),
            })),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Envelope {
            code: self.status.as_u16(),
            message: self.message,
            data: self.data,
        };
        (self.status, Json(body)).into_response()
    }
}
