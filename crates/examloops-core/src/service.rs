use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use examloops_judge::{Corrector, ExamQuestion, Judge, Verdict};
use examloops_logging::Logger;

use crate::{AttemptCeiling, LoopError, LoopOutcome, LoopRunner, LoopState};

/// Entry point shared by the HTTP and CLI surfaces. Holds only immutable
/// handles; every call gets its own [`LoopRunner`] and [`LoopState`].
#[derive(Clone)]
pub struct ExamVerifier {
    judge: Arc<dyn Judge>,
    corrector: Arc<dyn Corrector>,
    logger: Arc<Logger>,
    invocation_timeout: Option<Duration>,
    interrupted: Arc<AtomicBool>,
}

impl ExamVerifier {
    pub fn new(judge: Arc<dyn Judge>, corrector: Arc<dyn Corrector>, logger: Arc<Logger>) -> Self {
        Self {
            judge,
            corrector,
            logger,
            invocation_timeout: None,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_invocation_timeout(mut self, timeout: Duration) -> Self {
        self.invocation_timeout = Some(timeout);
        self
    }

    /// Flag checked by every runner before each external call
    pub fn with_interrupt(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = interrupted;
        self
    }

    pub fn runner(&self) -> LoopRunner {
        let runner = LoopRunner::new(
            self.judge.clone(),
            self.corrector.clone(),
            self.logger.clone(),
        )
        .with_interrupt(self.interrupted.clone());

        match self.invocation_timeout {
            Some(timeout) => runner.with_invocation_timeout(timeout),
            None => runner,
        }
    }

    /// Judge once, never correct. The verdict is `outcome.final_verdict()`.
    pub async fn verify(&self, question: ExamQuestion) -> LoopOutcome {
        self.runner()
            .run(LoopState::new(question, AttemptCeiling::VERIFY_ONLY))
            .await
    }

    /// Apply a single correction for an externally supplied verdict. A
    /// compliant verdict hands the question back untouched.
    pub async fn fix(
        &self,
        question: ExamQuestion,
        verdict: &Verdict,
    ) -> Result<ExamQuestion, LoopError> {
        if verdict.is_compliant() {
            info!("Verdict is compliant, returning question unchanged");
            return Ok(question);
        }
        if self.interrupted.load(Ordering::SeqCst) {
            return Err(LoopError::Interrupted);
        }
        Ok(self.runner().revise(&question, verdict).await?)
    }

    /// Full bounded loop
    pub async fn verify_and_fix(
        &self,
        question: ExamQuestion,
        ceiling: AttemptCeiling,
    ) -> LoopOutcome {
        self.runner().run(LoopState::new(question, ceiling)).await
    }
}
