use examloops_judge::{ArtifactError, CorrectionError, EvaluationError};
use thiserror::Error;

use crate::FailureReason;

/// Malformed input, raised before the loop starts. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestValidationError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("Attempt ceiling must be between {min} and {max}, got {value}")]
    CeilingOutOfRange { value: i64, min: u8, max: u8 },
}

/// Why a loop run stopped without reaching a defined outcome
#[derive(Error, Debug)]
pub enum LoopError {
    #[error("Judge evaluation error: {0}")]
    EvaluationError(#[from] EvaluationError),

    #[error("Correction error: {0}")]
    CorrectionError(#[from] CorrectionError),

    #[error("Loop was cancelled")]
    Interrupted,
}

impl LoopError {
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            LoopError::EvaluationError(_) => FailureReason::EvaluationError,
            LoopError::CorrectionError(_) => FailureReason::CorrectionError,
            LoopError::Interrupted => FailureReason::Cancelled,
        }
    }

    /// Finer-grained cause, e.g. `timeout` or `type_mismatch`
    pub fn cause(&self) -> &'static str {
        match self {
            LoopError::EvaluationError(e) => e.reason(),
            LoopError::CorrectionError(e) => e.reason(),
            LoopError::Interrupted => "interrupted",
        }
    }
}
