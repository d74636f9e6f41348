use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum length of the question text, in characters
pub const MIN_QUESTION_CHARS: usize = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArtifactError {
    #[error("Unknown question type: {0}")]
    UnknownQuestionType(String),

    #[error("Question must be at least 5 characters")]
    QuestionTooShort,

    #[error("Answer must not be empty")]
    EmptyAnswer,
}

/// Closed set of supported question types. Each one maps to exactly one criterion set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum QuestionType {
    SingleChoice,
    MultiChoice,
    FillBlank,
    BriefAnswer,
    Calculation,
}

impl QuestionType {
    pub const ALL: [QuestionType; 5] = [
        QuestionType::SingleChoice,
        QuestionType::MultiChoice,
        QuestionType::FillBlank,
        QuestionType::BriefAnswer,
        QuestionType::Calculation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultiChoice => "multi_choice",
            QuestionType::FillBlank => "fill_blank",
            QuestionType::BriefAnswer => "brief_answer",
            QuestionType::Calculation => "calculation",
        }
    }

    /// Human-readable label used in prompts
    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single-choice question",
            QuestionType::MultiChoice => "multiple-choice question",
            QuestionType::FillBlank => "fill-in-the-blank question",
            QuestionType::BriefAnswer => "short-answer question",
            QuestionType::Calculation => "calculation question",
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QuestionType {
    type Err = ArtifactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "single_choice" | "单选题" => Ok(QuestionType::SingleChoice),
            "multi_choice" | "多选题" => Ok(QuestionType::MultiChoice),
            "fill_blank" | "填空题" => Ok(QuestionType::FillBlank),
            "brief_answer" | "简答题" => Ok(QuestionType::BriefAnswer),
            "calculation" | "计算题" => Ok(QuestionType::Calculation),
            other => Err(ArtifactError::UnknownQuestionType(other.to_string())),
        }
    }
}

impl TryFrom<String> for QuestionType {
    type Error = ArtifactError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QuestionType> for String {
    fn from(value: QuestionType) -> Self {
        value.as_str().to_string()
    }
}

/// The artifact under verification. A correction produces a new value; nothing
/// mutates a question once it has been judged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamQuestion {
    pub question: String,
    pub answer: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub knowledge_point: String,
    #[serde(default)]
    pub knowledge_point_description: String,
    #[serde(default)]
    pub extra_requirement: String,
}

impl ExamQuestion {
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        question_type: QuestionType,
    ) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            question_type,
            knowledge_point: String::new(),
            knowledge_point_description: String::new(),
            extra_requirement: String::new(),
        }
    }

    pub fn with_knowledge_point(
        mut self,
        point: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.knowledge_point = point.into();
        self.knowledge_point_description = description.into();
        self
    }

    pub fn with_extra_requirement(mut self, requirement: impl Into<String>) -> Self {
        self.extra_requirement = requirement.into();
        self
    }

    /// First characters of the question, for log lines
    pub fn preview(&self, max_chars: usize) -> String {
        let trimmed = self.question.trim();
        if trimmed.chars().count() <= max_chars {
            trimmed.to_string()
        } else {
            let head: String = trimmed.chars().take(max_chars).collect();
            format!("{}...", head)
        }
    }
}

/// Unvalidated question as received from a caller
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExamQuestionInput {
    pub question: String,
    pub answer: String,
    pub question_type: String,
    #[serde(default)]
    pub knowledge_point: Option<String>,
    #[serde(default)]
    pub knowledge_point_description: Option<String>,
    #[serde(default)]
    pub extra_requirement: Option<String>,
}

impl ExamQuestionInput {
    /// Trim every field and check the request-level constraints
    pub fn validate(self) -> Result<ExamQuestion, ArtifactError> {
        let question_type: QuestionType = self.question_type.parse()?;

        let question = self.question.trim().to_string();
        if question.chars().count() < MIN_QUESTION_CHARS {
            return Err(ArtifactError::QuestionTooShort);
        }

        let answer = self.answer.trim().to_string();
        if answer.is_empty() {
            return Err(ArtifactError::EmptyAnswer);
        }

        let trim_opt = |v: Option<String>| v.map(|s| s.trim().to_string()).unwrap_or_default();

        Ok(ExamQuestion {
            question,
            answer,
            question_type,
            knowledge_point: trim_opt(self.knowledge_point),
            knowledge_point_description: trim_opt(self.knowledge_point_description),
            extra_requirement: trim_opt(self.extra_requirement),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_and_chinese_aliases() {
        assert_eq!("single_choice".parse::<QuestionType>(), Ok(QuestionType::SingleChoice));
        assert_eq!("多选题".parse::<QuestionType>(), Ok(QuestionType::MultiChoice));
        assert_eq!(" 填空题 ".parse::<QuestionType>(), Ok(QuestionType::FillBlank));
        assert_eq!("简答题".parse::<QuestionType>(), Ok(QuestionType::BriefAnswer));
        assert_eq!("计算题".parse::<QuestionType>(), Ok(QuestionType::Calculation));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = "essay".parse::<QuestionType>().unwrap_err();
        assert_eq!(err, ArtifactError::UnknownQuestionType("essay".into()));
    }

    #[test]
    fn test_serializes_as_canonical_name() {
        let q = ExamQuestion::new("What is 2 + 2?", "4", QuestionType::Calculation);
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["question_type"], "calculation");

        let back: ExamQuestion = serde_json::from_value(serde_json::json!({
            "question": "What is 2 + 2?",
            "answer": "4",
            "question_type": "计算题"
        }))
        .unwrap();
        assert_eq!(back, q);
    }

    #[test]
    fn test_input_validation_trims_fields() {
        let input = ExamQuestionInput {
            question: "  请简述BFS和DFS的区别  ".into(),
            answer: " BFS按层扩展 ".into(),
            question_type: "简答题".into(),
            knowledge_point: Some(" 图搜索 ".into()),
            knowledge_point_description: None,
            extra_requirement: None,
        };
        let q = input.validate().unwrap();
        assert_eq!(q.question, "请简述BFS和DFS的区别");
        assert_eq!(q.answer, "BFS按层扩展");
        assert_eq!(q.knowledge_point, "图搜索");
        assert_eq!(q.knowledge_point_description, "");
        assert_eq!(q.question_type, QuestionType::BriefAnswer);
    }

    #[test]
    fn test_input_validation_errors() {
        let short = ExamQuestionInput {
            question: " abc ".into(),
            answer: "x".into(),
            question_type: "fill_blank".into(),
            ..Default::default()
        };
        assert_eq!(short.validate(), Err(ArtifactError::QuestionTooShort));

        let no_answer = ExamQuestionInput {
            question: "Long enough question".into(),
            answer: "   ".into(),
            question_type: "fill_blank".into(),
            ..Default::default()
        };
        assert_eq!(no_answer.validate(), Err(ArtifactError::EmptyAnswer));
    }

    #[test]
    fn test_preview_counts_characters() {
        let q = ExamQuestion::new("一二三四五六七八", "x", QuestionType::BriefAnswer);
        assert_eq!(q.preview(4), "一二三四...");
        assert_eq!(q.preview(20), "一二三四五六七八");
    }
}
