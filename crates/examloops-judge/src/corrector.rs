use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use examloops_model::{ChatModel, ModelConfig, ModelError};
use serde::Deserialize;
use tracing::{debug, info};

use crate::artifact::MIN_QUESTION_CHARS;
use crate::parse::{bare_object, tagged_block, Block};
use crate::{ExamQuestion, JudgePrompts, QuestionType, Verdict};

/// Produces a revised question from a non-compliant verdict
#[async_trait]
pub trait Corrector: Send + Sync {
    /// Revise the question. Only the given verdict is consulted; the returned
    /// question must keep the input's type.
    async fn revise(
        &self,
        question: &ExamQuestion,
        verdict: &Verdict,
    ) -> Result<ExamQuestion, CorrectionError>;
}

/// Check that a revision kept the question type
pub fn ensure_same_type(
    original: &ExamQuestion,
    revised: &ExamQuestion,
) -> Result<(), CorrectionError> {
    if original.question_type == revised.question_type {
        Ok(())
    } else {
        Err(CorrectionError::TypeMismatch {
            expected: original.question_type,
            actual: revised.question_type,
        })
    }
}

/// Corrector that delegates the rewrite to a chat model
pub struct ModelCorrector {
    model: Arc<dyn ChatModel>,
    config: ModelConfig,
}

impl ModelCorrector {
    pub fn new(model: Arc<dyn ChatModel>, config: ModelConfig) -> Self {
        Self { model, config }
    }
}

#[async_trait]
impl Corrector for ModelCorrector {
    async fn revise(
        &self,
        question: &ExamQuestion,
        verdict: &Verdict,
    ) -> Result<ExamQuestion, CorrectionError> {
        if verdict.is_compliant() {
            return Err(CorrectionError::NotNeeded);
        }

        let messages = JudgePrompts::build_fix_prompt(question, verdict);

        debug!(
            backend = self.model.name(),
            violations = verdict.violations().len(),
            "Running corrector"
        );

        let output = self.model.complete(&messages, &self.config).await?;
        let revised = parse_revision(&output.content, question)?;
        ensure_same_type(question, &revised)?;

        info!(
            question_type = %revised.question_type,
            duration_secs = output.duration.as_secs_f64(),
            "Corrector completed"
        );

        Ok(revised)
    }
}

/// Revision as returned by the model; omitted fields keep their previous value
#[derive(Debug, Deserialize)]
struct RevisedQuestion {
    question: String,
    answer: String,
    #[serde(default)]
    question_type: Option<String>,
    #[serde(default)]
    knowledge_point: Option<String>,
    #[serde(default)]
    knowledge_point_description: Option<String>,
    #[serde(default)]
    extra_requirement: Option<String>,
}

fn parse_revision(output: &str, previous: &ExamQuestion) -> Result<ExamQuestion, CorrectionError> {
    let json = match tagged_block(output, "question") {
        Block::Found(json) => json,
        Block::Malformed => {
            return Err(CorrectionError::ParseError(
                "Malformed question block".to_string(),
            ))
        }
        Block::Missing => bare_object(output).ok_or_else(|| {
            CorrectionError::ParseError("No revised question found in corrector output".to_string())
        })?,
    };

    let raw: RevisedQuestion =
        serde_json::from_str(json).map_err(|e| CorrectionError::ParseError(e.to_string()))?;

    let question_type = match raw.question_type {
        Some(t) => t
            .parse::<QuestionType>()
            .map_err(|e| CorrectionError::ParseError(e.to_string()))?,
        None => previous.question_type,
    };

    let question = raw.question.trim().to_string();
    let answer = raw.answer.trim().to_string();
    if question.is_empty() || answer.is_empty() {
        return Err(CorrectionError::ParseError(
            "Revised question or answer is empty".to_string(),
        ));
    }
    if question.chars().count() < MIN_QUESTION_CHARS {
        return Err(CorrectionError::ParseError(format!(
            "Revised question is shorter than {} characters",
            MIN_QUESTION_CHARS
        )));
    }

    let keep = |new: Option<String>, old: &str| {
        new.map(|s| s.trim().to_string())
            .unwrap_or_else(|| old.to_string())
    };

    Ok(ExamQuestion {
        question,
        answer,
        question_type,
        knowledge_point: keep(raw.knowledge_point, &previous.knowledge_point),
        knowledge_point_description: keep(
            raw.knowledge_point_description,
            &previous.knowledge_point_description,
        ),
        extra_requirement: keep(raw.extra_requirement, &previous.extra_requirement),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum CorrectionError {
    #[error("Correction requested for a compliant question")]
    NotNeeded,

    #[error("Reasoning backend error: {0}")]
    BackendError(String),

    #[error("Corrector timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to parse revised question: {0}")]
    ParseError(String),

    #[error("Corrector changed the question type from {expected} to {actual}")]
    TypeMismatch {
        expected: QuestionType,
        actual: QuestionType,
    },
}

impl CorrectionError {
    /// Stable tag for the failure cause
    pub fn reason(&self) -> &'static str {
        match self {
            CorrectionError::NotNeeded => "not_needed",
            CorrectionError::BackendError(_) => "backend_error",
            CorrectionError::Timeout(_) => "timeout",
            CorrectionError::ParseError(_) => "malformed_output",
            CorrectionError::TypeMismatch { .. } => "type_mismatch",
        }
    }
}

impl From<ModelError> for CorrectionError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Timeout(after) => CorrectionError::Timeout(after),
            other => CorrectionError::BackendError(other.to_string()),
        }
    }
}
