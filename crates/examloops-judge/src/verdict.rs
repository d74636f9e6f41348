use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::parse::{bare_object, tagged_block, Block};

/// One failed criterion with the judge's rationale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub criterion_name: String,
    pub explanation: String,
    #[serde(default)]
    pub suggested_direction: String,
}

impl Violation {
    pub fn new(
        criterion_name: impl Into<String>,
        explanation: impl Into<String>,
        suggested_direction: impl Into<String>,
    ) -> Self {
        Self {
            criterion_name: criterion_name.into(),
            explanation: explanation.into(),
            suggested_direction: suggested_direction.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerdictError {
    #[error("A compliant verdict must not carry violations")]
    CompliantWithViolations,

    #[error("A non-compliant verdict must carry at least one violation")]
    NonCompliantWithoutViolations,
}

/// Judge output for one (question, criterion set) pair.
///
/// `compliant` and an empty violation list always agree; every constructor,
/// including deserialization, rejects values where they don't.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawVerdict")]
pub struct Verdict {
    compliant: bool,
    violations: Vec<Violation>,
}

impl Verdict {
    pub fn compliant() -> Self {
        Self {
            compliant: true,
            violations: Vec::new(),
        }
    }

    pub fn non_compliant(violations: Vec<Violation>) -> Result<Self, VerdictError> {
        Self::new(false, violations)
    }

    pub fn new(compliant: bool, violations: Vec<Violation>) -> Result<Self, VerdictError> {
        match (compliant, violations.is_empty()) {
            (true, false) => Err(VerdictError::CompliantWithViolations),
            (false, true) => Err(VerdictError::NonCompliantWithoutViolations),
            _ => Ok(Self {
                compliant,
                violations,
            }),
        }
    }

    pub fn is_compliant(&self) -> bool {
        self.compliant
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Parse the verdict from a judge reply.
    ///
    /// Expected format:
    /// ```text
    /// <verdict>
    /// {"compliant": false, "violations": [{"criterion_name": "...", "explanation": "...", "suggested_direction": "..."}]}
    /// </verdict>
    /// ```
    /// A reply consisting of just the JSON object is accepted too.
    pub fn parse(output: &str) -> Result<Self, VerdictParseError> {
        debug!(output_len = output.len(), "Parsing judge verdict");

        let json = match tagged_block(output, "verdict") {
            Block::Found(json) => json,
            Block::Malformed => {
                return Err(VerdictParseError::InvalidFormat(
                    "Malformed verdict block".to_string(),
                ))
            }
            Block::Missing => bare_object(output).ok_or(VerdictParseError::NoVerdictFound)?,
        };

        Ok(serde_json::from_str(json)?)
    }

    /// Short description for logs
    pub fn summary(&self) -> String {
        match self.violations.len() {
            0 => "COMPLIANT".to_string(),
            1 => "NON-COMPLIANT (1 violation)".to_string(),
            n => format!("NON-COMPLIANT ({} violations)", n),
        }
    }

    /// Violations rendered as one line each, for prompts and terminal output
    pub fn feedback(&self) -> String {
        self.violations
            .iter()
            .map(|v| {
                if v.suggested_direction.is_empty() {
                    format!("- [{}] {}", v.criterion_name, v.explanation)
                } else {
                    format!(
                        "- [{}] {} Suggested fix: {}",
                        v.criterion_name, v.explanation, v.suggested_direction
                    )
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Wire shape accepted for verdicts. Also takes the single-suggestion form
/// `{"is_compliant": false, "suggestion": "..."}` used by older clients.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(alias = "is_compliant", alias = "Compliance")]
    compliant: bool,
    #[serde(default)]
    violations: Vec<Violation>,
    #[serde(default)]
    suggestion: Option<String>,
}

impl TryFrom<RawVerdict> for Verdict {
    type Error = VerdictError;

    fn try_from(raw: RawVerdict) -> Result<Self, Self::Error> {
        let mut violations = raw.violations;
        if !raw.compliant && violations.is_empty() {
            if let Some(suggestion) = raw.suggestion.filter(|s| !s.trim().is_empty()) {
                violations.push(Violation::new(
                    "reviewer_suggestion",
                    "The question was reported as non-compliant.",
                    suggestion.trim(),
                ));
            }
        }
        Verdict::new(raw.compliant, violations)
    }
}

#[derive(Error, Debug)]
pub enum VerdictParseError {
    #[error("No verdict found in judge output")]
    NoVerdictFound,

    #[error("Failed to parse verdict JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Invalid verdict format: {0}")]
    InvalidFormat(String),
}
