//! # examloops-judge
//!
//! Compliance checking for exam questions.
//!
//! ## Key Types
//!
//! - [`ExamQuestion`] - The artifact under verification
//! - [`CriterionSet`] - Ordered checks for one question type
//! - [`Verdict`] - Judge output; compliant iff it carries no violations
//! - [`Judge`] / [`Corrector`] - Contracts the loop controller drives
//! - [`ModelJudge`] / [`ModelCorrector`] - Implementations backed by a [`ChatModel`](examloops_model::ChatModel)

mod artifact;
pub mod corrector;
mod criteria;
pub mod judge;
mod parse;
mod prompts;
mod verdict;

pub use artifact::{ArtifactError, ExamQuestion, ExamQuestionInput, QuestionType};
pub use corrector::{ensure_same_type, CorrectionError, Corrector, ModelCorrector};
pub use criteria::{Criterion, CriterionSet};
pub use judge::{EvaluationError, Judge, ModelJudge};
pub use prompts::JudgePrompts;
pub use verdict::{Verdict, VerdictError, VerdictParseError, Violation};
