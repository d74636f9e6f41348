use examloops_judge::{ExamQuestion, Verdict};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{AttemptRecord, LoopError};

/// Why a run ended in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    EvaluationError,
    CorrectionError,
    Cancelled,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::EvaluationError => "evaluation_error",
            FailureReason::CorrectionError => "correction_error",
            FailureReason::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The final outcome of a verify-correct run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoopOutcome {
    /// The judge found the question compliant
    Accepted {
        attempts: usize,
        question: ExamQuestion,
        history: Vec<AttemptRecord>,
        total_duration_secs: f64,
    },
    /// Ceiling reached with the last verdict still non-compliant
    Exhausted {
        attempts: usize,
        question: ExamQuestion,
        history: Vec<AttemptRecord>,
        total_duration_secs: f64,
    },
    /// A judge or corrector call failed, or the run was cancelled
    Failed {
        attempts: usize,
        reason: FailureReason,
        cause: String,
        error: String,
        question: ExamQuestion,
        history: Vec<AttemptRecord>,
        total_duration_secs: f64,
    },
}

impl LoopOutcome {
    pub fn accepted(
        attempts: usize,
        question: ExamQuestion,
        history: Vec<AttemptRecord>,
        duration: Duration,
    ) -> Self {
        Self::Accepted {
            attempts,
            question,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn exhausted(
        attempts: usize,
        question: ExamQuestion,
        history: Vec<AttemptRecord>,
        duration: Duration,
    ) -> Self {
        Self::Exhausted {
            attempts,
            question,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn failed(
        attempts: usize,
        error: &LoopError,
        question: ExamQuestion,
        history: Vec<AttemptRecord>,
        duration: Duration,
    ) -> Self {
        Self::Failed {
            attempts,
            reason: error.failure_reason(),
            cause: error.cause().to_string(),
            error: error.to_string(),
            question,
            history,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Accepted { .. } => "accepted",
            Self::Exhausted { .. } => "exhausted",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn attempts(&self) -> usize {
        match self {
            Self::Accepted { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Failed { attempts, .. } => *attempts,
        }
    }

    /// The last question the run held: the accepted one, the last correction,
    /// or whatever was current when it failed
    pub fn question(&self) -> &ExamQuestion {
        match self {
            Self::Accepted { question, .. }
            | Self::Exhausted { question, .. }
            | Self::Failed { question, .. } => question,
        }
    }

    pub fn history(&self) -> &[AttemptRecord] {
        match self {
            Self::Accepted { history, .. }
            | Self::Exhausted { history, .. }
            | Self::Failed { history, .. } => history,
        }
    }

    pub fn final_verdict(&self) -> Option<&Verdict> {
        self.history().last().map(|record| &record.verdict)
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::Failed { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Accepted { .. } => 0,
            Self::Exhausted { .. } => 1,
            Self::Failed {
                reason: FailureReason::Cancelled,
                ..
            } => 130,
            Self::Failed { .. } => 2,
        }
    }
}
