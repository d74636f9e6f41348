use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use examloops_model::{ChatModel, ModelConfig, ModelError};
use tracing::{debug, info, warn};

use crate::{CriterionSet, ExamQuestion, JudgePrompts, Verdict, VerdictParseError};

/// Decides whether a question complies with its criterion set
#[async_trait]
pub trait Judge: Send + Sync {
    /// Evaluate the question. Must not modify it.
    async fn evaluate(
        &self,
        question: &ExamQuestion,
        criteria: &CriterionSet,
    ) -> Result<Verdict, EvaluationError>;
}

/// Judge that delegates the review to a chat model
pub struct ModelJudge {
    model: Arc<dyn ChatModel>,
    config: ModelConfig,
}

impl ModelJudge {
    pub fn new(model: Arc<dyn ChatModel>, config: ModelConfig) -> Self {
        Self { model, config }
    }
}

#[async_trait]
impl Judge for ModelJudge {
    async fn evaluate(
        &self,
        question: &ExamQuestion,
        criteria: &CriterionSet,
    ) -> Result<Verdict, EvaluationError> {
        let messages = JudgePrompts::build_verification_prompt(question, criteria);

        debug!(
            backend = self.model.name(),
            question_type = %criteria.question_type,
            criteria = criteria.len(),
            "Running judge evaluation"
        );

        let output = self.model.complete(&messages, &self.config).await?;

        let verdict = Verdict::parse(&output.content)?;

        for violation in verdict.violations() {
            if !criteria.contains(&violation.criterion_name) {
                warn!(
                    criterion = %violation.criterion_name,
                    "Judge reported a criterion outside the set"
                );
            }
        }

        info!(
            question_type = %criteria.question_type,
            verdict = %verdict.summary(),
            duration_secs = output.duration.as_secs_f64(),
            "Judge completed"
        );

        Ok(verdict)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Reasoning backend error: {0}")]
    BackendError(String),

    #[error("Judge timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to parse judge verdict: {0}")]
    ParseError(#[from] VerdictParseError),
}

impl EvaluationError {
    /// Stable tag for the failure cause
    pub fn reason(&self) -> &'static str {
        match self {
            EvaluationError::BackendError(_) => "backend_error",
            EvaluationError::Timeout(_) => "timeout",
            EvaluationError::ParseError(_) => "malformed_output",
        }
    }
}

impl From<ModelError> for EvaluationError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Timeout(after) => EvaluationError::Timeout(after),
            other => EvaluationError::BackendError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QuestionType;
    use examloops_model::{ChatMessage, ModelBinding, ModelOutput};

    /// Chat model that always answers with the same text
    struct CannedModel(Result<String, fn() -> ModelError>);

    #[async_trait]
    impl ChatModel for CannedModel {
        fn name(&self) -> &str {
            "canned"
        }

        fn binding(&self) -> ModelBinding {
            ModelBinding::DeepSeek
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn complete(
            &self,
            _messages: &[ChatMessage],
            config: &ModelConfig,
        ) -> Result<ModelOutput, ModelError> {
            match &self.0 {
                Ok(text) => Ok(ModelOutput::new(
                    text.clone(),
                    config.model.clone(),
                    Duration::from_millis(5),
                )),
                Err(make) => Err(make()),
            }
        }
    }

    fn judge(reply: Result<String, fn() -> ModelError>) -> ModelJudge {
        ModelJudge::new(Arc::new(CannedModel(reply)), ModelConfig::default())
    }

    fn question() -> ExamQuestion {
        ExamQuestion::new("Which number is prime? A.4 B.6 C.7 D.9", "C", QuestionType::SingleChoice)
    }

    #[tokio::test]
    async fn test_compliant_reply() {
        let judge = judge(Ok("<verdict>{\"compliant\": true}</verdict>".into()));
        let q = question();
        let verdict = judge
            .evaluate(&q, &CriterionSet::for_type(q.question_type))
            .await
            .unwrap();
        assert!(verdict.is_compliant());
    }

    #[tokio::test]
    async fn test_malformed_reply_is_parse_error() {
        let judge = judge(Ok("I think it is fine.".into()));
        let q = question();
        let err = judge
            .evaluate(&q, &CriterionSet::for_type(q.question_type))
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_backend_timeout_maps_to_timeout() {
        let judge = judge(Err(|| ModelError::Timeout(Duration::from_secs(3))));
        let q = question();
        let err = judge
            .evaluate(&q, &CriterionSet::for_type(q.question_type))
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Timeout(d) if d == Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn test_backend_failure_maps_to_backend_error() {
        let judge = judge(Err(|| ModelError::Http("connection refused".into())));
        let q = question();
        let err = judge
            .evaluate(&q, &CriterionSet::for_type(q.question_type))
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::BackendError(msg) if msg.contains("connection refused")));
    }
}
