use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use examloops_core::{
    AttemptCeiling, ExamVerifier, FailureReason, LoopError, LoopOutcome, LoopRunner, LoopState,
    RequestValidationError,
};
use examloops_judge::{
    ArtifactError, CorrectionError, Corrector, CriterionSet, EvaluationError, ExamQuestion,
    ExamQuestionInput, Judge, QuestionType, Verdict, Violation,
};
use examloops_logging::{LogFormat, Logger};

// ============================================================
// Stubs
// ============================================================

#[derive(Clone)]
enum JudgeStep {
    Compliant,
    NonCompliant,
    Timeout,
    /// Never answers within any reasonable limit
    Hang,
    /// Non-compliant, and raise the interrupt flag while answering
    NonCompliantThenInterrupt(Arc<AtomicBool>),
}

/// Judge that replays a script; once the script runs out it repeats `fallback`
struct ScriptedJudge {
    script: Mutex<VecDeque<JudgeStep>>,
    fallback: JudgeStep,
    calls: AtomicUsize,
    seen: Mutex<Vec<ExamQuestion>>,
}

impl ScriptedJudge {
    fn new(script: Vec<JudgeStep>, fallback: JudgeStep) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn always(step: JudgeStep) -> Arc<Self> {
        Self::new(vec![], step)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn violation() -> Violation {
    Violation::new(
        "clear_statement",
        "The question is ambiguous",
        "State the expected unit",
    )
}

#[async_trait]
impl Judge for ScriptedJudge {
    async fn evaluate(
        &self,
        question: &ExamQuestion,
        _criteria: &CriterionSet,
    ) -> Result<Verdict, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(question.clone());
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            JudgeStep::Compliant => Ok(Verdict::compliant()),
            JudgeStep::NonCompliant => Ok(Verdict::non_compliant(vec![violation()]).unwrap()),
            JudgeStep::Timeout => Err(EvaluationError::Timeout(Duration::from_secs(120))),
            JudgeStep::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Verdict::compliant())
            }
            JudgeStep::NonCompliantThenInterrupt(flag) => {
                flag.store(true, Ordering::SeqCst);
                Ok(Verdict::non_compliant(vec![violation()]).unwrap())
            }
        }
    }
}

/// Judge that accepts only questions containing `marker`
struct MarkerJudge {
    marker: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl Judge for MarkerJudge {
    async fn evaluate(
        &self,
        question: &ExamQuestion,
        _criteria: &CriterionSet,
    ) -> Result<Verdict, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if question.question.contains(self.marker) {
            Ok(Verdict::compliant())
        } else {
            Ok(Verdict::non_compliant(vec![violation()]).unwrap())
        }
    }
}

#[derive(Clone, Copy)]
enum CorrectorMode {
    /// Append " (revision n)" to the question
    Numbering,
    Fail,
    ChangeType,
    Hang,
}

struct StubCorrector {
    mode: CorrectorMode,
    calls: AtomicUsize,
    verdicts: Mutex<Vec<Verdict>>,
}

impl StubCorrector {
    fn new(mode: CorrectorMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            calls: AtomicUsize::new(0),
            verdicts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Corrector for StubCorrector {
    async fn revise(
        &self,
        question: &ExamQuestion,
        verdict: &Verdict,
    ) -> Result<ExamQuestion, CorrectionError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.verdicts.lock().unwrap().push(verdict.clone());

        match self.mode {
            CorrectorMode::Numbering => {
                let base = question
                    .question
                    .split(" (revision")
                    .next()
                    .unwrap_or_default();
                let mut revised = question.clone();
                revised.question = format!("{} (revision {})", base, n);
                Ok(revised)
            }
            CorrectorMode::Fail => Err(CorrectionError::BackendError("503 from backend".into())),
            CorrectorMode::ChangeType => {
                let mut revised = question.clone();
                revised.question_type = QuestionType::BriefAnswer;
                Ok(revised)
            }
            CorrectorMode::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(question.clone())
            }
        }
    }
}

fn logger() -> Arc<Logger> {
    Arc::new(Logger::new(LogFormat::Compact))
}

fn question() -> ExamQuestion {
    ExamQuestion::new(
        "A train travels 120 km in 2 hours. What is its average speed?",
        "60 km/h",
        QuestionType::Calculation,
    )
}

fn ceiling(n: i64) -> AttemptCeiling {
    AttemptCeiling::new(n).unwrap()
}

fn runner(judge: Arc<dyn Judge>, corrector: Arc<dyn Corrector>) -> LoopRunner {
    LoopRunner::new(judge, corrector, logger())
}

// ============================================================
// Scenarios
// ============================================================

#[tokio::test]
async fn scenario_a_accepts_on_first_judgement() {
    let judge = ScriptedJudge::always(JudgeStep::Compliant);
    let corrector = StubCorrector::new(CorrectorMode::Numbering);

    let outcome = runner(judge.clone(), corrector.clone())
        .run(LoopState::new(question(), ceiling(1)))
        .await;

    assert!(outcome.is_accepted());
    assert_eq!(outcome.history().len(), 1);
    assert_eq!(outcome.attempts(), 1);
    assert_eq!(outcome.question(), &question());
    assert_eq!(judge.calls(), 1);
    assert_eq!(corrector.calls(), 0);
}

#[tokio::test]
async fn scenario_b_exhausts_and_returns_last_correction() {
    let judge = ScriptedJudge::always(JudgeStep::NonCompliant);
    let corrector = StubCorrector::new(CorrectorMode::Numbering);

    let outcome = runner(judge.clone(), corrector.clone())
        .run(LoopState::new(question(), ceiling(3)))
        .await;

    assert!(matches!(outcome, LoopOutcome::Exhausted { .. }));
    assert_eq!(outcome.history().len(), 3);
    assert_eq!(judge.calls(), 3);
    assert_eq!(corrector.calls(), 2);
    assert!(outcome.question().question.ends_with("(revision 2)"));
    assert_eq!(outcome.history()[2].question, *outcome.question());
    assert!(!outcome.final_verdict().unwrap().is_compliant());
}

#[tokio::test]
async fn scenario_c_correction_error_fails_the_run() {
    let judge = ScriptedJudge::always(JudgeStep::NonCompliant);
    let corrector = StubCorrector::new(CorrectorMode::Fail);

    let outcome = runner(judge.clone(), corrector.clone())
        .run(LoopState::new(question(), ceiling(3)))
        .await;

    assert_eq!(outcome.failure_reason(), Some(FailureReason::CorrectionError));
    assert_eq!(outcome.history().len(), 1);
    assert_eq!(judge.calls(), 1);
    assert_eq!(corrector.calls(), 1);
    assert_eq!(outcome.exit_code(), 2);
}

#[tokio::test]
async fn scenario_d_judge_timeout_fails_with_empty_history() {
    let judge = ScriptedJudge::always(JudgeStep::Timeout);
    let corrector = StubCorrector::new(CorrectorMode::Numbering);

    let outcome = runner(judge.clone(), corrector.clone())
        .run(LoopState::new(question(), ceiling(2)))
        .await;

    assert_eq!(outcome.failure_reason(), Some(FailureReason::EvaluationError));
    assert!(outcome.history().is_empty());
    assert_eq!(corrector.calls(), 0);
    match outcome {
        LoopOutcome::Failed { cause, .. } => assert_eq!(cause, "timeout"),
        other => panic!("expected failure, got {}", other.status()),
    }
}

#[test]
fn scenario_e_unknown_type_is_rejected_before_the_loop() {
    let input = ExamQuestionInput {
        question: "Explain recursion in your own words".into(),
        answer: "A function calling itself".into(),
        question_type: "true_false".into(),
        ..Default::default()
    };

    let err = LoopState::from_input(input, 3).unwrap_err();
    assert_eq!(
        err,
        RequestValidationError::Artifact(ArtifactError::UnknownQuestionType(
            "true_false".into()
        ))
    );
}

// ============================================================
// Bounds
// ============================================================

#[tokio::test]
async fn test_call_bounds_for_every_ceiling() {
    for c in AttemptCeiling::all() {
        let judge = ScriptedJudge::always(JudgeStep::NonCompliant);
        let corrector = StubCorrector::new(CorrectorMode::Numbering);

        let outcome = runner(judge.clone(), corrector.clone())
            .run(LoopState::new(question(), c))
            .await;

        assert_eq!(outcome.status(), "exhausted");
        assert_eq!(judge.calls(), c.get(), "judge calls for ceiling {}", c);
        assert_eq!(corrector.calls(), c.get() - 1, "corrector calls for ceiling {}", c);
        assert_eq!(outcome.history().len(), c.get());
        assert_eq!(outcome.attempts(), c.get());
    }
}

#[tokio::test]
async fn test_early_acceptance_stops_the_loop() {
    let judge = Arc::new(MarkerJudge {
        marker: "(revision 2)",
        calls: AtomicUsize::new(0),
    });
    let corrector = StubCorrector::new(CorrectorMode::Numbering);

    let outcome = runner(judge.clone(), corrector.clone())
        .run(LoopState::new(question(), ceiling(5)))
        .await;

    assert!(outcome.is_accepted());
    assert_eq!(outcome.attempts(), 3);
    assert_eq!(judge.calls.load(Ordering::SeqCst), 3);
    assert_eq!(corrector.calls(), 2);
    assert!(outcome.final_verdict().unwrap().is_compliant());
}

#[tokio::test]
async fn test_corrector_sees_only_latest_verdict_and_current_question() {
    let judge = ScriptedJudge::new(
        vec![JudgeStep::NonCompliant, JudgeStep::NonCompliant],
        JudgeStep::Compliant,
    );
    let corrector = StubCorrector::new(CorrectorMode::Numbering);

    let outcome = runner(judge.clone(), corrector.clone())
        .run(LoopState::new(question(), ceiling(3)))
        .await;

    assert!(outcome.is_accepted());
    let seen = judge.seen.lock().unwrap();
    assert_eq!(seen[0], question());
    assert!(seen[1].question.ends_with("(revision 1)"));
    assert!(seen[2].question.ends_with("(revision 2)"));
    let verdicts = corrector.verdicts.lock().unwrap();
    assert_eq!(verdicts.len(), 2);
    assert!(verdicts.iter().all(|v| !v.is_compliant()));
}

#[tokio::test]
async fn test_accepting_an_accepted_question_again_is_idempotent() {
    let judge = ScriptedJudge::always(JudgeStep::Compliant);
    let corrector = StubCorrector::new(CorrectorMode::Numbering);
    let runner = runner(judge.clone(), corrector.clone());

    let first = runner.run(LoopState::new(question(), ceiling(3))).await;
    let second = runner
        .run(LoopState::new(first.question().clone(), ceiling(3)))
        .await;

    assert!(second.is_accepted());
    assert_eq!(second.attempts(), 1);
    assert_eq!(second.question(), first.question());
    assert_eq!(corrector.calls(), 0);
}

// ============================================================
// Failure modes
// ============================================================

#[tokio::test]
async fn test_type_changing_correction_is_rejected() {
    let judge = ScriptedJudge::always(JudgeStep::NonCompliant);
    let corrector = StubCorrector::new(CorrectorMode::ChangeType);

    let outcome = runner(judge.clone(), corrector)
        .run(LoopState::new(question(), ceiling(3)))
        .await;

    match outcome {
        LoopOutcome::Failed {
            reason,
            cause,
            question,
            ..
        } => {
            assert_eq!(reason, FailureReason::CorrectionError);
            assert_eq!(cause, "type_mismatch");
            assert_eq!(question.question_type, QuestionType::Calculation);
        }
        other => panic!("expected failure, got {}", other.status()),
    }
    assert_eq!(judge.calls(), 1);
}

#[tokio::test]
async fn test_interrupt_before_start_makes_no_calls() {
    let judge = ScriptedJudge::always(JudgeStep::Compliant);
    let corrector = StubCorrector::new(CorrectorMode::Numbering);
    let runner = runner(judge.clone(), corrector.clone());
    runner.interrupt_handle().store(true, Ordering::SeqCst);

    let outcome = runner.run(LoopState::new(question(), ceiling(3))).await;

    assert_eq!(outcome.failure_reason(), Some(FailureReason::Cancelled));
    assert_eq!(outcome.exit_code(), 130);
    assert!(outcome.history().is_empty());
    assert_eq!(judge.calls(), 0);
}

#[tokio::test]
async fn test_interrupt_between_calls_keeps_history() {
    let flag = Arc::new(AtomicBool::new(false));
    let judge = ScriptedJudge::always(JudgeStep::NonCompliantThenInterrupt(flag.clone()));
    let corrector = StubCorrector::new(CorrectorMode::Numbering);

    let outcome = runner(judge.clone(), corrector.clone())
        .with_interrupt(flag)
        .run(LoopState::new(question(), ceiling(3)))
        .await;

    assert_eq!(outcome.failure_reason(), Some(FailureReason::Cancelled));
    assert_eq!(outcome.history().len(), 1);
    assert_eq!(corrector.calls(), 0);
}

#[tokio::test]
async fn test_corrector_timeout_is_correction_error() {
    let judge = ScriptedJudge::always(JudgeStep::NonCompliant);
    let corrector = StubCorrector::new(CorrectorMode::Hang);

    let outcome = runner(judge, corrector)
        .with_invocation_timeout(Duration::from_millis(50))
        .run(LoopState::new(question(), ceiling(2)))
        .await;

    match outcome {
        LoopOutcome::Failed { reason, cause, .. } => {
            assert_eq!(reason, FailureReason::CorrectionError);
            assert_eq!(cause, "timeout");
        }
        other => panic!("expected failure, got {}", other.status()),
    }
}

#[tokio::test]
async fn test_hanging_judge_is_cut_off_by_invocation_timeout() {
    let judge = ScriptedJudge::always(JudgeStep::Hang);
    let corrector = StubCorrector::new(CorrectorMode::Numbering);

    let outcome = runner(judge.clone(), corrector.clone())
        .with_invocation_timeout(Duration::from_millis(50))
        .run(LoopState::new(question(), ceiling(2)))
        .await;

    match outcome {
        LoopOutcome::Failed {
            attempts,
            reason,
            cause,
            question: last,
            history,
            ..
        } => {
            assert_eq!(reason, FailureReason::EvaluationError);
            assert_eq!(cause, "timeout");
            assert_eq!(attempts, 1);
            assert!(history.is_empty());
            assert_eq!(last, question());
        }
        other => panic!("expected failure, got {}", other.status()),
    }
    assert_eq!(judge.calls(), 1);
    assert_eq!(corrector.calls(), 0);
}

// ============================================================
// Projections
// ============================================================

#[tokio::test]
async fn test_verify_never_corrects() {
    let judge = ScriptedJudge::always(JudgeStep::NonCompliant);
    let corrector = StubCorrector::new(CorrectorMode::Numbering);
    let verifier = ExamVerifier::new(judge.clone(), corrector.clone(), logger());

    let outcome = verifier.verify(question()).await;

    assert_eq!(outcome.status(), "exhausted");
    assert_eq!(outcome.final_verdict().unwrap().violations().len(), 1);
    assert_eq!(judge.calls(), 1);
    assert_eq!(corrector.calls(), 0);
}

#[tokio::test]
async fn test_fix_with_compliant_verdict_returns_question_unchanged() {
    let judge = ScriptedJudge::always(JudgeStep::Compliant);
    let corrector = StubCorrector::new(CorrectorMode::Numbering);
    let verifier = ExamVerifier::new(judge.clone(), corrector.clone(), logger());

    let fixed = verifier
        .fix(question(), &Verdict::compliant())
        .await
        .unwrap();

    assert_eq!(fixed, question());
    assert_eq!(corrector.calls(), 0);
    assert_eq!(judge.calls(), 0);
}

#[tokio::test]
async fn test_fix_applies_one_correction() {
    let judge = ScriptedJudge::always(JudgeStep::Compliant);
    let corrector = StubCorrector::new(CorrectorMode::Numbering);
    let verifier = ExamVerifier::new(judge.clone(), corrector.clone(), logger());
    let verdict = Verdict::non_compliant(vec![violation()]).unwrap();

    let fixed = verifier.fix(question(), &verdict).await.unwrap();

    assert!(fixed.question.ends_with("(revision 1)"));
    assert_eq!(corrector.calls(), 1);
    assert_eq!(judge.calls(), 0);
}

#[tokio::test]
async fn test_fix_propagates_type_mismatch() {
    let verifier = ExamVerifier::new(
        ScriptedJudge::always(JudgeStep::Compliant),
        StubCorrector::new(CorrectorMode::ChangeType),
        logger(),
    );
    let verdict = Verdict::non_compliant(vec![violation()]).unwrap();

    let err = verifier.fix(question(), &verdict).await.unwrap_err();
    assert!(matches!(
        err,
        LoopError::CorrectionError(CorrectionError::TypeMismatch { .. })
    ));
    assert_eq!(err.failure_reason(), FailureReason::CorrectionError);
}

#[tokio::test]
async fn test_verify_and_fix_shares_nothing_between_runs() {
    let judge = ScriptedJudge::always(JudgeStep::NonCompliant);
    let corrector = StubCorrector::new(CorrectorMode::Numbering);
    let verifier = ExamVerifier::new(judge.clone(), corrector.clone(), logger())
        .with_invocation_timeout(Duration::from_secs(5));

    let (a, b) = tokio::join!(
        verifier.verify_and_fix(question(), ceiling(2)),
        verifier.verify_and_fix(question(), ceiling(3)),
    );

    assert_eq!(a.history().len(), 2);
    assert_eq!(b.history().len(), 3);
    assert_eq!(judge.calls(), 5);
    assert_eq!(corrector.calls(), 3);
}
