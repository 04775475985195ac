// src/models/question.rs

use std::{borrow::Cow, collections::HashSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::ValidationError;

use crate::utils::html::clean_html;

/// Upper bound per question; keeps a full quiz's total well inside `i32`.
pub const MAX_QUESTION_POINTS: i32 = 1000;

/// Discriminant of a question, as exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    FillBlank,
    OneChoiceAnswer,
}

/// Type-specific body of a question, including its answer key.
///
/// The `type` tag decides the shape of `correctAnswer`: a string for the
/// choice and fill-in types, a boolean for true/false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        #[serde(rename = "correctAnswer")]
        correct_answer: String,
    },
    TrueFalse {
        #[serde(rename = "correctAnswer")]
        correct_answer: bool,
    },
    FillBlank {
        #[serde(rename = "correctAnswer")]
        correct_answer: String,
    },
    OneChoiceAnswer {
        options: Vec<String>,
        #[serde(rename = "correctAnswer")]
        correct_answer: String,
    },
}

/// A question embedded in a quiz. Not addressable on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique within its quiz.
    pub id: String,

    pub prompt: String,

    #[serde(flatten)]
    pub kind: QuestionKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,

    #[serde(default = "default_points")]
    pub points: i32,
}

fn default_points() -> i32 {
    1
}

/// A submitted (or expected) answer.
///
/// Anything that is neither a boolean nor a string lands in `Other` so that a
/// garbled answer grades as incorrect instead of rejecting the whole submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum AnswerValue {
    Bool(bool),
    Text(String),
    Other(serde_json::Value),
}

impl QuestionKind {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::TrueFalse { .. } => QuestionType::TrueFalse,
            QuestionKind::FillBlank { .. } => QuestionType::FillBlank,
            QuestionKind::OneChoiceAnswer { .. } => QuestionType::OneChoiceAnswer,
        }
    }

    pub fn options(&self) -> Option<&[String]> {
        match self {
            QuestionKind::MultipleChoice { options, .. }
            | QuestionKind::OneChoiceAnswer { options, .. } => Some(options),
            QuestionKind::TrueFalse { .. } | QuestionKind::FillBlank { .. } => None,
        }
    }

    pub fn correct_answer(&self) -> AnswerValue {
        match self {
            QuestionKind::MultipleChoice { correct_answer, .. }
            | QuestionKind::OneChoiceAnswer { correct_answer, .. }
            | QuestionKind::FillBlank { correct_answer } => AnswerValue::Text(correct_answer.clone()),
            QuestionKind::TrueFalse { correct_answer } => AnswerValue::Bool(*correct_answer),
        }
    }

    /// Cross-field rules for each question type.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            QuestionKind::MultipleChoice { options, correct_answer }
            | QuestionKind::OneChoiceAnswer { options, correct_answer } => {
                validate_options(options)?;
                if !options.contains(correct_answer) {
                    return Err(invalid(
                        "correct_answer_not_an_option",
                        "correctAnswer must be one of the options",
                    ));
                }
                Ok(())
            }
            QuestionKind::FillBlank { correct_answer } => {
                if correct_answer.trim().is_empty() {
                    return Err(invalid(
                        "empty_correct_answer",
                        "fill_blank questions need a non-empty correctAnswer",
                    ));
                }
                Ok(())
            }
            QuestionKind::TrueFalse { .. } => Ok(()),
        }
    }
}

impl Question {
    /// Builds a validated question from its parts.
    pub fn new(
        id: impl Into<String>,
        prompt: impl Into<String>,
        kind: QuestionKind,
        points: i32,
    ) -> Result<Self, ValidationError> {
        let question = Question {
            id: id.into(),
            prompt: prompt.into(),
            kind,
            explanation: None,
            points,
        };
        question.validate_definition()?;
        Ok(question)
    }

    pub fn multiple_choice(
        id: impl Into<String>,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
        points: i32,
    ) -> Result<Self, ValidationError> {
        let kind = QuestionKind::MultipleChoice {
            options,
            correct_answer: correct_answer.into(),
        };
        Self::new(id, prompt, kind, points)
    }

    pub fn one_choice(
        id: impl Into<String>,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
        points: i32,
    ) -> Result<Self, ValidationError> {
        let kind = QuestionKind::OneChoiceAnswer {
            options,
            correct_answer: correct_answer.into(),
        };
        Self::new(id, prompt, kind, points)
    }

    pub fn true_false(
        id: impl Into<String>,
        prompt: impl Into<String>,
        correct_answer: bool,
        points: i32,
    ) -> Result<Self, ValidationError> {
        Self::new(id, prompt, QuestionKind::TrueFalse { correct_answer }, points)
    }

    pub fn fill_blank(
        id: impl Into<String>,
        prompt: impl Into<String>,
        correct_answer: impl Into<String>,
        points: i32,
    ) -> Result<Self, ValidationError> {
        let kind = QuestionKind::FillBlank {
            correct_answer: correct_answer.into(),
        };
        Self::new(id, prompt, kind, points)
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Checks the rules that serde cannot express on its own.
    pub fn validate_definition(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(invalid("empty_question_id", "question id cannot be empty"));
        }
        if self.prompt.trim().is_empty() || self.prompt.len() > 2000 {
            return Err(invalid(
                "invalid_prompt",
                "question prompt must be between 1 and 2000 characters",
            ));
        }
        if !(1..=MAX_QUESTION_POINTS).contains(&self.points) {
            return Err(invalid(
                "invalid_points",
                "question points must be between 1 and 1000",
            ));
        }
        if let Some(explanation) = &self.explanation {
            if explanation.len() > 2000 {
                return Err(invalid("explanation_too_long", "explanation is too long"));
            }
        }
        self.kind.validate()
    }

    /// Strips unsafe markup from display-only text.
    ///
    /// Options and answer keys are compared verbatim during grading and are left untouched.
    pub fn sanitized(mut self) -> Self {
        self.prompt = clean_html(&self.prompt);
        self.explanation = self.explanation.map(|e| clean_html(&e));
        self
    }
}

/// Question as shown to a taker: no answer key, no explanation.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub points: i32,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id.clone(),
            question_type: q.kind.question_type(),
            prompt: q.prompt.clone(),
            options: q.kind.options().map(<[String]>::to_vec),
            points: q.points,
        }
    }
}

/// Validator for a quiz's question list: non-empty, unique ids, each question well-formed.
pub fn validate_questions(questions: &[Question]) -> Result<(), ValidationError> {
    if questions.is_empty() {
        return Err(invalid("questions_cannot_be_empty", "a quiz needs at least one question"));
    }
    if questions.len() > 500 {
        return Err(invalid("too_many_questions", "a quiz can hold at most 500 questions"));
    }

    let mut seen = HashSet::new();
    for question in questions {
        if !seen.insert(question.id.as_str()) {
            return Err(invalid("duplicate_question_id", "question ids must be unique"));
        }
        question.validate_definition()?;
    }
    Ok(())
}

fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    if options.len() < 2 {
        return Err(invalid(
            "too_few_options",
            "choice questions need at least two options",
        ));
    }
    let mut seen = HashSet::new();
    for opt in options {
        if opt.trim().is_empty() {
            return Err(invalid("empty_option", "options cannot be empty"));
        }
        if opt.len() > 500 {
            return Err(invalid("option_too_long", "options are limited to 500 characters"));
        }
        if !seen.insert(opt.as_str()) {
            return Err(invalid("duplicate_option", "options must be distinct"));
        }
    }
    Ok(())
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_multiple_choice_requires_two_options() {
        let err = Question::multiple_choice("q1", "Pick", opts(&["A"]), "A", 1).unwrap_err();
        assert_eq!(err.code, "too_few_options");
    }

    #[test]
    fn test_correct_answer_must_be_an_option() {
        let err = Question::one_choice("q1", "Pick", opts(&["A", "B"]), "C", 1).unwrap_err();
        assert_eq!(err.code, "correct_answer_not_an_option");
    }

    #[test]
    fn test_points_must_be_positive() {
        let err = Question::true_false("q1", "Sky is blue", true, 0).unwrap_err();
        assert_eq!(err.code, "invalid_points");
    }

    #[test]
    fn test_points_are_capped() {
        assert!(Question::true_false("q1", "Sky is blue", true, MAX_QUESTION_POINTS).is_ok());
        let err = Question::true_false("q1", "Sky is blue", true, i32::MAX).unwrap_err();
        assert_eq!(err.code, "invalid_points");
    }

    #[test]
    fn test_fill_blank_rejects_blank_answer() {
        let err = Question::fill_blank("q1", "Capital of France?", "   ", 1).unwrap_err();
        assert_eq!(err.code, "empty_correct_answer");
    }

    #[test]
    fn test_deserializes_tagged_question() {
        let q: Question = serde_json::from_value(json!({
            "id": "q1",
            "type": "true_false",
            "prompt": "Rust has a borrow checker",
            "correctAnswer": true
        }))
        .unwrap();

        assert_eq!(q.kind, QuestionKind::TrueFalse { correct_answer: true });
        assert_eq!(q.points, 1);
        assert!(q.validate_definition().is_ok());
    }

    #[test]
    fn test_answer_type_mismatch_is_rejected_at_parse_time() {
        let parsed = serde_json::from_value::<Question>(json!({
            "id": "q1",
            "type": "true_false",
            "prompt": "Boolean please",
            "correctAnswer": "yes"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_unknown_question_type_is_rejected() {
        let parsed = serde_json::from_value::<Question>(json!({
            "id": "q1",
            "type": "essay",
            "prompt": "Discuss",
            "correctAnswer": "anything"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let q = Question::fill_blank("q2", "Capital of France?", "Paris", 2).unwrap();
        let value = serde_json::to_value(&q).unwrap();
        assert_eq!(value["type"], "fill_blank");
        assert_eq!(value["correctAnswer"], "Paris");
        assert_eq!(value["points"], 2);
    }

    #[test]
    fn test_public_question_hides_key() {
        let q = Question::multiple_choice("q1", "Pick", opts(&["A", "B"]), "B", 1)
            .unwrap()
            .with_explanation("B is right");
        let value = serde_json::to_value(PublicQuestion::from(&q)).unwrap();
        assert!(value.get("correctAnswer").is_none());
        assert!(value.get("explanation").is_none());
        assert_eq!(value["type"], "multiple_choice");
        assert_eq!(value["options"], json!(["A", "B"]));
    }

    #[test]
    fn test_validate_questions_rejects_duplicates_and_empty() {
        assert_eq!(validate_questions(&[]).unwrap_err().code, "questions_cannot_be_empty");

        let q = Question::true_false("q1", "Yes?", true, 1).unwrap();
        let err = validate_questions(&[q.clone(), q]).unwrap_err();
        assert_eq!(err.code, "duplicate_question_id");
    }

    #[test]
    fn test_garbled_answer_parses_as_other() {
        let answer: AnswerValue = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(answer, AnswerValue::Other(json!(42)));
        let answer: AnswerValue = serde_json::from_value(json!("B")).unwrap();
        assert_eq!(answer, AnswerValue::Text("B".into()));
    }

    #[test]
    fn test_sanitized_keeps_answer_key() {
        let q = Question::fill_blank("q1", "<script>x</script>Capital?", "A & B", 1)
            .unwrap()
            .sanitized();
        assert_eq!(q.prompt, "Capital?");
        assert_eq!(q.kind.correct_answer(), AnswerValue::Text("A & B".into()));
    }
}
