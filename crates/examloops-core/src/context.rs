use chrono::{DateTime, Utc};
use examloops_judge::{CriterionSet, ExamQuestion, ExamQuestionInput, Verdict};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::RequestValidationError;

/// Maximum number of judge invocations for one run, in `MIN..=MAX`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct AttemptCeiling(u8);

impl AttemptCeiling {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;
    pub const DEFAULT: AttemptCeiling = AttemptCeiling(3);
    /// A ceiling of one judges once and never corrects
    pub const VERIFY_ONLY: AttemptCeiling = AttemptCeiling(1);

    /// Values outside the range are rejected, never clamped
    pub fn new(value: i64) -> Result<Self, RequestValidationError> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(RequestValidationError::CeilingOutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            })
        }
    }

    pub fn get(&self) -> usize {
        self.0 as usize
    }

    /// Every ceiling a caller may request
    pub fn all() -> impl Iterator<Item = AttemptCeiling> {
        (Self::MIN..=Self::MAX).map(AttemptCeiling)
    }
}

impl Default for AttemptCeiling {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for AttemptCeiling {
    type Error = RequestValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AttemptCeiling> for u8 {
    fn from(value: AttemptCeiling) -> Self {
        value.0
    }
}

impl std::fmt::Display for AttemptCeiling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Record of one executed judge call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-indexed attempt number
    pub attempt: usize,
    /// The question as it was judged
    pub question: ExamQuestion,
    pub verdict: Verdict,
    pub timestamp: DateTime<Utc>,
}

/// Per-request state of the verify-correct loop. Owned by one runner for the
/// duration of a run and dropped once the outcome is returned.
#[derive(Debug, Clone)]
pub struct LoopState {
    current: ExamQuestion,
    criteria: CriterionSet,
    latest_verdict: Option<Verdict>,
    /// Current attempt (1-indexed)
    attempt: usize,
    ceiling: AttemptCeiling,
    history: Vec<AttemptRecord>,
    started_at: Instant,
}

impl LoopState {
    pub fn new(question: ExamQuestion, ceiling: AttemptCeiling) -> Self {
        Self {
            criteria: CriterionSet::for_type(question.question_type),
            current: question,
            latest_verdict: None,
            attempt: 1,
            ceiling,
            history: Vec::new(),
            started_at: Instant::now(),
        }
    }

    /// Validate caller input and build the initial state
    pub fn from_input(
        input: ExamQuestionInput,
        max_attempts: i64,
    ) -> Result<Self, RequestValidationError> {
        let ceiling = AttemptCeiling::new(max_attempts)?;
        let question = input.validate()?;
        Ok(Self::new(question, ceiling))
    }

    pub fn current(&self) -> &ExamQuestion {
        &self.current
    }

    pub fn criteria(&self) -> &CriterionSet {
        &self.criteria
    }

    pub fn latest_verdict(&self) -> Option<&Verdict> {
        self.latest_verdict.as_ref()
    }

    pub fn attempt(&self) -> usize {
        self.attempt
    }

    pub fn ceiling(&self) -> AttemptCeiling {
        self.ceiling
    }

    pub fn history(&self) -> &[AttemptRecord] {
        &self.history
    }

    pub fn is_last_attempt(&self) -> bool {
        self.attempt >= self.ceiling.get()
    }

    pub fn total_duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub(crate) fn record_verdict(&mut self, verdict: Verdict) {
        self.history.push(AttemptRecord {
            attempt: self.attempt,
            question: self.current.clone(),
            verdict: verdict.clone(),
            timestamp: Utc::now(),
        });
        self.latest_verdict = Some(verdict);
    }

    /// Replace the current question with a revision and move to the next attempt
    pub(crate) fn adopt_revision(&mut self, revised: ExamQuestion) {
        self.current = revised;
        self.attempt += 1;
    }

    pub(crate) fn into_parts(self) -> (ExamQuestion, Vec<AttemptRecord>, Duration) {
        let duration = self.total_duration();
        (self.current, self.history, duration)
    }
}
