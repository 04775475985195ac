// src/store/mod.rs

//! Persistence seams for quizzes, attempts and the course lookup.

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        quiz::{NewQuiz, Quiz},
        quiz_attempt::{AttemptCompletion, NewAttempt, QuizAttempt},
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage for quiz definitions and attempts.
///
/// Implementations must enforce uniqueness of `(user_id, quiz_id, attempt_number)`
/// (reporting a violation as `AppError::Conflict`) and must complete an attempt
/// with compare-and-set semantics.
#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn insert_quiz(&self, quiz: NewQuiz) -> Result<Quiz, AppError>;

    async fn find_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError>;

    /// Persists every mutable field of `quiz`. Returns `false` if it no longer exists.
    async fn save_quiz(&self, quiz: &Quiz) -> Result<bool, AppError>;

    /// Deletes the quiz and all of its attempts atomically.
    /// Returns the number of attempts purged, or `None` if the quiz did not exist.
    async fn delete_quiz(&self, id: i64) -> Result<Option<u64>, AppError>;

    async fn list_quizzes(
        &self,
        course_id: i64,
        include_unpublished: bool,
    ) -> Result<Vec<Quiz>, AppError>;

    async fn count_completed_attempts(&self, quiz_id: i64, user_id: &str) -> Result<i64, AppError>;

    async fn find_open_attempt(
        &self,
        quiz_id: i64,
        user_id: &str,
    ) -> Result<Option<QuizAttempt>, AppError>;

    async fn insert_attempt(&self, attempt: NewAttempt) -> Result<QuizAttempt, AppError>;

    async fn find_attempt(&self, id: i64) -> Result<Option<QuizAttempt>, AppError>;

    /// Completes an open attempt. Returns `None` if it was already completed
    /// (or vanished) by the time the write happened.
    async fn complete_attempt(
        &self,
        id: i64,
        completion: AttemptCompletion,
    ) -> Result<Option<QuizAttempt>, AppError>;

    /// Completed attempts for a quiz, most recent first, optionally for one user only.
    async fn list_completed_attempts(
        &self,
        quiz_id: i64,
        user_id: Option<&str>,
    ) -> Result<Vec<QuizAttempt>, AppError>;
}

/// Read-only view of the course catalogue owned by the wider platform.
#[async_trait]
pub trait CourseDirectory: Send + Sync {
    async fn course_exists(&self, course_id: i64) -> Result<bool, AppError>;
}
