use serde::Serialize;

use crate::QuestionType;

/// One named compliance check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Criterion {
    pub name: &'static str,
    pub description: &'static str,
}

const fn criterion(name: &'static str, description: &'static str) -> Criterion {
    Criterion { name, description }
}

const CLEAR_STATEMENT: Criterion = criterion(
    "clear_statement",
    "The question is stated clearly, unambiguously and without typos or missing information.",
);
const KNOWLEDGE_POINT_ALIGNMENT: Criterion = criterion(
    "knowledge_point_alignment",
    "The question assesses the stated knowledge point and stays within its description (skip when no knowledge point is given).",
);
const EXTRA_REQUIREMENT: Criterion = criterion(
    "extra_requirement_satisfied",
    "The question and answer satisfy every extra requirement supplied by the author (skip when none is given).",
);

static SINGLE_CHOICE: &[Criterion] = &[
    CLEAR_STATEMENT,
    criterion(
        "exactly_one_correct_option",
        "Exactly one option is correct; every distractor is definitely wrong.",
    ),
    criterion(
        "answer_matches_option",
        "The declared answer names an option that exists and is the correct one.",
    ),
    criterion(
        "objectively_determinable",
        "The correct option can be determined objectively, without opinion or unstated assumptions.",
    ),
    criterion(
        "plausible_distractors",
        "Options are mutually exclusive, of similar form and length, and the distractors are plausible.",
    ),
    KNOWLEDGE_POINT_ALIGNMENT,
    EXTRA_REQUIREMENT,
];

static MULTI_CHOICE: &[Criterion] = &[
    CLEAR_STATEMENT,
    criterion(
        "multiple_correct_options",
        "At least two options are correct and the question signals that more than one may be chosen.",
    ),
    criterion(
        "answer_lists_all_correct_options",
        "The declared answer lists every correct option and no incorrect one.",
    ),
    criterion(
        "objectively_determinable",
        "Whether each option is correct can be decided objectively.",
    ),
    criterion(
        "independent_options",
        "Options do not overlap or imply one another.",
    ),
    KNOWLEDGE_POINT_ALIGNMENT,
    EXTRA_REQUIREMENT,
];

static FILL_BLANK: &[Criterion] = &[
    CLEAR_STATEMENT,
    criterion(
        "blanks_clearly_marked",
        "Every blank is explicitly marked and the expected kind of content is evident.",
    ),
    criterion(
        "unique_answer_per_blank",
        "Each blank admits a single correct answer, or the accepted equivalents are listed.",
    ),
    criterion(
        "answer_matches_blanks",
        "The declared answer supplies one correct value per blank, in order.",
    ),
    KNOWLEDGE_POINT_ALIGNMENT,
    EXTRA_REQUIREMENT,
];

static BRIEF_ANSWER: &[Criterion] = &[
    CLEAR_STATEMENT,
    criterion(
        "bounded_scope",
        "The expected scope and depth of the response are clear enough to be answered briefly.",
    ),
    criterion(
        "answer_covers_key_points",
        "The declared answer covers every key point the question asks for and is factually correct.",
    ),
    criterion(
        "gradable",
        "The answer can be graded consistently against the declared key points.",
    ),
    KNOWLEDGE_POINT_ALIGNMENT,
    EXTRA_REQUIREMENT,
];

static CALCULATION: &[Criterion] = &[
    CLEAR_STATEMENT,
    criterion(
        "sufficient_data",
        "All data needed to solve the problem is given, with units, and nothing contradicts.",
    ),
    criterion(
        "stepwise_solvability",
        "The problem can be solved step by step with methods expected at this knowledge point.",
    ),
    criterion(
        "answer_numerically_correct",
        "The declared answer is numerically correct, with correct units and precision.",
    ),
    KNOWLEDGE_POINT_ALIGNMENT,
    EXTRA_REQUIREMENT,
];

/// Ordered checks applicable to one question type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CriterionSet {
    pub question_type: QuestionType,
    criteria: &'static [Criterion],
}

impl CriterionSet {
    /// Resolve the set for a question type
    pub fn for_type(question_type: QuestionType) -> Self {
        let criteria = match question_type {
            QuestionType::SingleChoice => SINGLE_CHOICE,
            QuestionType::MultiChoice => MULTI_CHOICE,
            QuestionType::FillBlank => FILL_BLANK,
            QuestionType::BriefAnswer => BRIEF_ANSWER,
            QuestionType::Calculation => CALCULATION,
        };
        Self {
            question_type,
            criteria,
        }
    }

    pub fn criteria(&self) -> &'static [Criterion] {
        self.criteria
    }

    pub fn contains(&self, name: &str) -> bool {
        self.criteria.iter().any(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        self.criteria.iter().map(|c| c.name)
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}
