use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use examloops_judge::{
    ensure_same_type, CorrectionError, Corrector, CriterionSet, EvaluationError, ExamQuestion,
    Judge, Verdict,
};
use examloops_logging::{LogEvent, Logger};

use crate::error::LoopError;
use crate::outcome::LoopOutcome;
use crate::LoopState;

/// Non-terminal states of the loop. Attempts are 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Verifying(usize),
    Correcting(usize),
}

/// Orchestrates the bounded verify-correct loop for one request
pub struct LoopRunner {
    judge: Arc<dyn Judge>,
    corrector: Arc<dyn Corrector>,
    logger: Arc<Logger>,
    invocation_timeout: Option<Duration>,
    interrupted: Arc<AtomicBool>,
}

impl LoopRunner {
    pub fn new(judge: Arc<dyn Judge>, corrector: Arc<dyn Corrector>, logger: Arc<Logger>) -> Self {
        Self {
            judge,
            corrector,
            logger,
            invocation_timeout: None,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Bound every judge and corrector call
    pub fn with_invocation_timeout(mut self, timeout: Duration) -> Self {
        self.invocation_timeout = Some(timeout);
        self
    }

    /// Share an existing interrupt flag, e.g. one wired to Ctrl+C
    pub fn with_interrupt(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = interrupted;
        self
    }

    /// Get a handle to signal interruption
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Run the loop until the question is accepted, the ceiling is reached,
    /// or a call fails. Never returns early without a terminal outcome.
    pub async fn run(&self, mut state: LoopState) -> LoopOutcome {
        self.logger.log(&LogEvent::LoopStarted {
            question_type: state.current().question_type.to_string(),
            max_attempts: state.ceiling().get(),
            question_preview: state.current().preview(80),
        });

        let mut phase = LoopPhase::Verifying(1);

        loop {
            if self.is_interrupted() {
                info!(attempt = state.attempt(), "Loop interrupted");
                return self.fail(state, LoopError::Interrupted);
            }

            phase = match phase {
                LoopPhase::Verifying(attempt) => {
                    debug_assert_eq!(attempt, state.attempt());
                    let judged = self.judge_step(&mut state).await;
                    let verdict = match judged {
                        Ok(verdict) => verdict,
                        Err(e) => return self.fail(state, e.into()),
                    };

                    if verdict.is_compliant() {
                        return self.accept(state);
                    }
                    if state.is_last_attempt() {
                        return self.exhaust(state);
                    }
                    LoopPhase::Correcting(attempt)
                }
                LoopPhase::Correcting(attempt) => {
                    let verdict = match state.latest_verdict() {
                        Some(verdict) => verdict.clone(),
                        None => {
                            warn!(attempt, "Correcting without a verdict");
                            return self.fail(
                                state,
                                LoopError::CorrectionError(CorrectionError::NotNeeded),
                            );
                        }
                    };

                    self.logger.log(&LogEvent::CorrectorStarted {
                        attempt,
                        violations: verdict.violations().len(),
                    });
                    let start = Instant::now();

                    let revision = self.revise(state.current(), &verdict).await;
                    match revision {
                        Ok(revised) => {
                            self.logger.log(&LogEvent::CorrectorCompleted {
                                attempt,
                                duration_secs: start.elapsed().as_secs_f64(),
                            });
                            state.adopt_revision(revised);
                            LoopPhase::Verifying(attempt + 1)
                        }
                        Err(e) => return self.fail(state, e.into()),
                    }
                }
            };
        }
    }

    async fn judge_step(&self, state: &mut LoopState) -> Result<Verdict, EvaluationError> {
        let attempt = state.attempt();
        self.logger.log(&LogEvent::JudgeStarted { attempt });
        debug!(attempt, criteria = state.criteria().len(), "Running judge");
        let start = Instant::now();

        let verdict = self.evaluate(state.current(), state.criteria()).await?;

        self.logger.log(&LogEvent::JudgeCompleted {
            attempt,
            verdict: verdict.summary(),
            duration_secs: start.elapsed().as_secs_f64(),
        });
        state.record_verdict(verdict.clone());
        Ok(verdict)
    }

    /// One judge call, bounded by the invocation timeout
    pub async fn evaluate(
        &self,
        question: &ExamQuestion,
        criteria: &CriterionSet,
    ) -> Result<Verdict, EvaluationError> {
        match bounded(self.invocation_timeout, self.judge.evaluate(question, criteria)).await {
            Some(result) => result,
            None => Err(EvaluationError::Timeout(self.timeout_or_zero())),
        }
    }

    /// One corrector call, bounded by the invocation timeout. A revision that
    /// changes the question type is rejected whatever the corrector claims.
    pub async fn revise(
        &self,
        question: &ExamQuestion,
        verdict: &Verdict,
    ) -> Result<ExamQuestion, CorrectionError> {
        let revised = match bounded(self.invocation_timeout, self.corrector.revise(question, verdict))
            .await
        {
            Some(result) => result?,
            None => return Err(CorrectionError::Timeout(self.timeout_or_zero())),
        };
        ensure_same_type(question, &revised)?;
        Ok(revised)
    }

    fn timeout_or_zero(&self) -> Duration {
        self.invocation_timeout.unwrap_or_default()
    }

    fn accept(&self, state: LoopState) -> LoopOutcome {
        let attempts = state.attempt();
        let (question, history, duration) = state.into_parts();
        self.logger.log(&LogEvent::LoopAccepted {
            attempts,
            duration_secs: duration.as_secs_f64(),
        });
        LoopOutcome::accepted(attempts, question, history, duration)
    }

    fn exhaust(&self, state: LoopState) -> LoopOutcome {
        let attempts = state.attempt();
        let (question, history, duration) = state.into_parts();
        self.logger.log(&LogEvent::AttemptsExhausted {
            attempts,
            duration_secs: duration.as_secs_f64(),
        });
        LoopOutcome::exhausted(attempts, question, history, duration)
    }

    fn fail(&self, state: LoopState, error: LoopError) -> LoopOutcome {
        let attempt = state.attempt();
        warn!(attempt, error = %error, "Loop failed");
        self.logger.log(&LogEvent::LoopFailed {
            attempt,
            reason: error.failure_reason().to_string(),
            error: error.to_string(),
        });
        let (question, history, duration) = state.into_parts();
        LoopOutcome::failed(attempt, &error, question, history, duration)
    }
}

/// Await `fut`, giving up after `limit`. `None` means the limit elapsed.
async fn bounded<F: Future>(limit: Option<Duration>, fut: F) -> Option<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}
