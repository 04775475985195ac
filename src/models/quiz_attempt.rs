// src/models/quiz_attempt.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::question::AnswerValue;

/// Submitted answers keyed by question id.
pub type AnswerSheet = BTreeMap<String, AnswerValue>;

/// Represents the 'quiz_attempts' table.
///
/// Open while `completed_at` is `None`; completed exactly once by submission
/// and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: String,
    /// 1-based, unique per (user, quiz).
    pub attempt_number: i32,
    #[schema(value_type = Object)]
    pub answers: AnswerSheet,
    pub results: Vec<QuestionResult>,
    pub score: i32,
    pub total_points: i32,
    pub percentage: i32,
    pub passed: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Seconds between start and submission.
    pub time_taken: Option<i64>,
    pub is_auto_submitted: bool,
}

impl QuizAttempt {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Per-question grading outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: String,
    pub user_answer: Option<AnswerValue>,
    pub correct_answer: AnswerValue,
    pub is_correct: bool,
    /// Points awarded.
    pub points: i32,
    pub max_points: i32,
}

/// Values for a freshly opened attempt.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub quiz_id: i64,
    pub user_id: String,
    pub attempt_number: i32,
    pub total_points: i32,
    pub started_at: DateTime<Utc>,
}

/// Everything written when an attempt is submitted.
#[derive(Debug, Clone)]
pub struct AttemptCompletion {
    pub answers: AnswerSheet,
    pub results: Vec<QuestionResult>,
    pub score: i32,
    pub total_points: i32,
    pub percentage: i32,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
    pub time_taken: i64,
    pub is_auto_submitted: bool,
}

/// DTO for submitting an attempt.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptRequest {
    #[serde(default)]
    #[schema(value_type = Object)]
    pub answers: AnswerSheet,
    /// Set by the client when the time limit forced the submission.
    #[serde(default)]
    pub is_auto_submitted: bool,
}

/// Graded attempt returned by a submission, with the quiz's display policy.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    #[serde(flatten)]
    pub attempt: QuizAttempt,
    pub passing_score: i32,
    pub show_correct_answers: bool,
}

/// Whether a user may start another attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Completed attempts so far.
    pub attempt_count: i64,
}

/// Aggregated numbers over all completed attempts of a quiz.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizStatistics {
    pub total_attempts: i64,
    pub unique_users: i64,
    pub average_score: i64,
    pub average_percentage: i64,
    pub pass_rate: i64,
    pub highest_score: i32,
    pub lowest_score: i32,
}
