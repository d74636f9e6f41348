use examloops_model::ChatMessage;

use crate::{CriterionSet, ExamQuestion, Verdict};

const JUDGE_SYSTEM: &str = "You are a professional exam question reviewer. You decide whether an exam question complies with the review criteria and, when it does not, explain what must change.";

const CORRECTOR_SYSTEM: &str = "You are a professional exam question editor. You rewrite an exam question so that it resolves every issue a reviewer reported while keeping its type and knowledge point.";

/// Prompt templates for the judge and the corrector
pub struct JudgePrompts;

impl JudgePrompts {
    /// Build the verification prompt for a question and its criterion set
    pub fn build_verification_prompt(
        question: &ExamQuestion,
        criteria: &CriterionSet,
    ) -> Vec<ChatMessage> {
        let checklist = criteria
            .criteria()
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. `{}`: {}", i + 1, c.name, c.description))
            .collect::<Vec<_>>()
            .join("\n");

        let user = format!(
            r#"Review the following {label}.

{question_block}

## Criteria

Check the question against every criterion below, in order:

{checklist}

## Required Response Format

Briefly reason about each criterion, then end your response with a verdict block.
Use the criterion names exactly as written above. Write explanations in the same language as the question.

**If every criterion is met:**
<verdict>
{{"compliant": true, "violations": []}}
</verdict>

**If any criterion is violated:**
<verdict>
{{"compliant": false, "violations": [{{"criterion_name": "name", "explanation": "What is wrong", "suggested_direction": "How to fix it"}}]}}
</verdict>"#,
            label = question.question_type.label(),
            question_block = render_question(question),
            checklist = checklist,
        );

        vec![ChatMessage::system(JUDGE_SYSTEM), ChatMessage::user(user)]
    }

    /// Build the correction prompt from a question and the latest verdict
    pub fn build_fix_prompt(question: &ExamQuestion, verdict: &Verdict) -> Vec<ChatMessage> {
        let user = format!(
            r#"Revise the following {label} so that it resolves every reported issue.

{question_block}

## Reported Issues
{feedback}

## Rules

- Keep the question type `{question_type}` and the knowledge point unchanged.
- Update the answer so that it matches the revised question.
- Honour the extra requirement, if any.
- Write in the same language as the original question.

## Required Response Format

End your response with the complete revised question:

<question>
{{"question": "...", "answer": "...", "question_type": "{question_type}", "knowledge_point": "...", "knowledge_point_description": "...", "extra_requirement": "..."}}
</question>"#,
            label = question.question_type.label(),
            question_block = render_question(question),
            feedback = verdict.feedback(),
            question_type = question.question_type,
        );

        vec![ChatMessage::system(CORRECTOR_SYSTEM), ChatMessage::user(user)]
    }
}

fn render_question(question: &ExamQuestion) -> String {
    format!(
        r#"## Question
{question}

## Declared Answer
{answer}

## Question Type
{question_type}

## Knowledge Point
{knowledge_point}

## Knowledge Point Description
{description}

## Extra Requirement
{extra}"#,
        question = question.question,
        answer = question.answer,
        question_type = question.question_type,
        knowledge_point = or_none(&question.knowledge_point),
        description = or_none(&question.knowledge_point_description),
        extra = or_none(&question.extra_requirement),
    )
}

fn or_none(s: &str) -> &str {
    if s.trim().is_empty() {
        "(none)"
    } else {
        s
    }
}
