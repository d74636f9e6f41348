use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::json;

use examloops_core::{AttemptCeiling, LoopOutcome, RequestValidationError};
use examloops_judge::{ExamQuestionInput, Verdict};

use super::{ApiError, AppState, Envelope};

#[derive(Debug, Deserialize)]
pub struct FixRequest {
    pub exam_question: ExamQuestionInput,
    #[serde(alias = "verification_result")]
    pub verdict: Verdict,
}

#[derive(Debug, Deserialize)]
pub struct VerifyAndFixRequest {
    pub exam_question: ExamQuestionInput,
    #[serde(default = "default_max_fix_attempts")]
    pub max_fix_attempts: i64,
}

fn default_max_fix_attempts() -> i64 {
    AttemptCeiling::DEFAULT.get() as i64
}

pub async fn root() -> Json<Envelope> {
    Json(Envelope {
        code: 0,
        message: "examloops API is running. POST questions to /api/v1/verify, /api/v1/fix or /api/v1/verify-and-fix.".to_string(),
        data: None,
    })
}

pub async fn health() -> Json<Envelope> {
    Envelope::ok(json!({ "status": "healthy" }))
}

pub async fn verify(
    State(state): State<AppState>,
    payload: Result<Json<ExamQuestionInput>, JsonRejection>,
) -> Result<Json<Envelope>, ApiError> {
    let Json(input) = payload?;
    let question = input.validate().map_err(RequestValidationError::from)?;

    let outcome = state.verifier.verify(question).await;

    match (&outcome, outcome.final_verdict()) {
        (LoopOutcome::Failed { .. }, _) | (_, None) => Err(ApiError::from_outcome(&outcome)),
        (_, Some(verdict)) => {
            let mut data = serde_json::to_value(verdict).map_err(|e| {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            })?;
            if let Some(fields) = data.as_object_mut() {
                fields.insert("status".to_string(), json!(outcome.status()));
            }
            Ok(Envelope::ok(data))
        }
    }
}

pub async fn fix(
    State(state): State<AppState>,
    payload: Result<Json<FixRequest>, JsonRejection>,
) -> Result<Json<Envelope>, ApiError> {
    let Json(request) = payload?;
    let question = request
        .exam_question
        .validate()
        .map_err(RequestValidationError::from)?;

    let revised = state.verifier.fix(question, &request.verdict).await?;
    Ok(Envelope::ok(revised))
}

pub async fn verify_and_fix(
    State(state): State<AppState>,
    payload: Result<Json<VerifyAndFixRequest>, JsonRejection>,
) -> Result<Json<Envelope>, ApiError> {
    let Json(request) = payload?;
    let ceiling = AttemptCeiling::new(request.max_fix_attempts)?;
    let question = request
        .exam_question
        .validate()
        .map_err(RequestValidationError::from)?;

    let outcome = state.verifier.verify_and_fix(question, ceiling).await;

    if matches!(outcome, LoopOutcome::Failed { .. }) {
        return Err(ApiError::from_outcome(&outcome));
    }
    Ok(Envelope::ok(&outcome))
}
