// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        question::{PublicQuestion, Question, validate_questions},
        quiz_attempt::QuizAttempt,
    },
    utils::html::clean_html,
};

/// Represents the 'quizzes' table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: i64,
    pub course_id: i64,
    /// Opaque id of the authoring user.
    pub created_by: String,
    pub title: String,
    pub description: Option<String>,
    /// Stored order; grading always walks this order.
    pub questions: Vec<Question>,
    /// Minimum percentage (0-100) needed to pass.
    pub passing_score: i32,
    /// Minutes; `None` means untimed.
    pub time_limit: Option<i32>,
    /// 0 means unlimited.
    pub allowed_attempts: i32,
    pub shuffle_questions: bool,
    pub show_correct_answers: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quiz {
    pub fn total_points(&self) -> i32 {
        self.questions
            .iter()
            .fold(0i32, |total, q| total.saturating_add(q.points))
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.created_by == user_id
    }
}

/// Full quiz (answer keys included) plus its derived total.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub total_points: i32,
}

impl From<Quiz> for QuizDetail {
    fn from(quiz: Quiz) -> Self {
        let total_points = quiz.total_points();
        QuizDetail { quiz, total_points }
    }
}

/// Quiz listed for a course, with the caller's own completed attempts when known.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseQuiz {
    #[serde(flatten)]
    pub detail: QuizDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_attempts: Option<Vec<QuizAttempt>>,
}

/// Projection handed to a taker: no answer keys, no explanations.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizForTaking {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub questions: Vec<PublicQuestion>,
    pub passing_score: i32,
    pub time_limit: Option<i32>,
    pub allowed_attempts: i32,
    pub show_correct_answers: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub total_points: i32,
    /// Completed attempts the caller already used.
    pub attempt_count: i64,
}

impl QuizForTaking {
    pub fn new(quiz: &Quiz, attempt_count: i64) -> Self {
        QuizForTaking {
            id: quiz.id,
            course_id: quiz.course_id,
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            questions: quiz.questions.iter().map(PublicQuestion::from).collect(),
            passing_score: quiz.passing_score,
            time_limit: quiz.time_limit,
            allowed_attempts: quiz.allowed_attempts,
            show_correct_answers: quiz.show_correct_answers,
            start_date: quiz.start_date,
            due_date: quiz.due_date,
            total_points: quiz.total_points(),
            attempt_count,
        }
    }
}

fn default_passing_score() -> i32 {
    70
}

fn default_true() -> bool {
    true
}

/// DTO for creating a quiz.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    pub course_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(custom(function = validate_questions))]
    pub questions: Vec<Question>,
    #[serde(default = "default_passing_score")]
    #[validate(range(min = 0, max = 100))]
    pub passing_score: i32,
    #[validate(range(min = 1, max = 1440))]
    pub time_limit: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub allowed_attempts: i32,
    #[serde(default)]
    pub shuffle_questions: bool,
    #[serde(default = "default_true")]
    pub show_correct_answers: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_published: bool,
}

/// A validated quiz ready to be stored.
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub course_id: i64,
    pub created_by: String,
    pub title: String,
    pub description: Option<String>,
    pub questions: Vec<Question>,
    pub passing_score: i32,
    pub time_limit: Option<i32>,
    pub allowed_attempts: i32,
    pub shuffle_questions: bool,
    pub show_correct_answers: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub is_published: bool,
}

impl CreateQuizRequest {
    /// Validates the request and turns it into a sanitized `NewQuiz`.
    ///
    /// Text is sanitized before validation, so markup-only fields count as empty.
    pub fn into_new_quiz(mut self, created_by: &str) -> Result<NewQuiz, AppError> {
        self.title = clean_html(&self.title);
        self.description = self.description.map(|d| clean_html(&d));
        self.questions = self.questions.into_iter().map(Question::sanitized).collect();

        self.validate()?;
        check_schedule(self.start_date, self.due_date)?;

        Ok(NewQuiz {
            course_id: self.course_id,
            created_by: created_by.to_string(),
            title: self.title,
            description: self.description,
            questions: self.questions,
            passing_score: self.passing_score,
            time_limit: self.time_limit,
            allowed_attempts: self.allowed_attempts,
            shuffle_questions: self.shuffle_questions,
            show_correct_answers: self.show_correct_answers,
            start_date: self.start_date,
            due_date: self.due_date,
            is_published: self.is_published,
        })
    }
}

/// Treats an explicit `null` as `Some(None)` so a patch can clear a field.
fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// DTO for patching a quiz. Absent fields are left unchanged;
/// nullable fields accept `null` to clear them.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[validate(custom(function = validate_questions))]
    pub questions: Option<Vec<Question>>,
    #[validate(range(min = 0, max = 100))]
    pub passing_score: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub time_limit: Option<Option<i32>>,
    #[validate(range(min = 0))]
    pub allowed_attempts: Option<i32>,
    pub shuffle_questions: Option<bool>,
    pub show_correct_answers: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub is_published: Option<bool>,
}

impl UpdateQuizRequest {
    /// Validates the patch and merges it into `quiz`.
    pub fn apply_to(mut self, quiz: &mut Quiz) -> Result<(), AppError> {
        self.title = self.title.map(|t| clean_html(&t));
        if let Some(Some(description)) = self.description.as_mut() {
            *description = clean_html(description);
        }
        self.questions = self
            .questions
            .map(|qs| qs.into_iter().map(Question::sanitized).collect());

        self.validate()?;

        if let Some(Some(description)) = &self.description {
            if description.len() > 5000 {
                return Err(AppError::BadRequest("description is too long".to_string()));
            }
        }
        if let Some(Some(limit)) = self.time_limit {
            if !(1..=1440).contains(&limit) {
                return Err(AppError::BadRequest(
                    "timeLimit must be between 1 and 1440 minutes".to_string(),
                ));
            }
        }

        let start_date = self.start_date.unwrap_or(quiz.start_date);
        let due_date = self.due_date.unwrap_or(quiz.due_date);
        check_schedule(start_date, due_date)?;

        if let Some(title) = self.title {
            quiz.title = title;
        }
        if let Some(description) = self.description {
            quiz.description = description;
        }
        if let Some(questions) = self.questions {
            quiz.questions = questions;
        }
        if let Some(passing_score) = self.passing_score {
            quiz.passing_score = passing_score;
        }
        if let Some(time_limit) = self.time_limit {
            quiz.time_limit = time_limit;
        }
        if let Some(allowed_attempts) = self.allowed_attempts {
            quiz.allowed_attempts = allowed_attempts;
        }
        if let Some(shuffle) = self.shuffle_questions {
            quiz.shuffle_questions = shuffle;
        }
        if let Some(show) = self.show_correct_answers {
            quiz.show_correct_answers = show;
        }
        if let Some(is_published) = self.is_published {
            quiz.is_published = is_published;
        }
        quiz.start_date = start_date;
        quiz.due_date = due_date;

        Ok(())
    }
}

fn check_schedule(
    start_date: Option<DateTime<Utc>>,
    due_date: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    if let (Some(start), Some(due)) = (start_date, due_date) {
        if due < start {
            return Err(AppError::BadRequest(
                "dueDate cannot be earlier than startDate".to_string(),
            ));
        }
    }
    Ok(())
}
