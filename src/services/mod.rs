// src/services/mod.rs

use std::sync::Arc;

use crate::{
    error::AppError,
    models::quiz::Quiz,
    store::{CourseDirectory, QuizStore},
};

pub mod attempts;
pub mod grading;
pub mod quizzes;
pub mod statistics;

/// Entry point for every quiz operation. Cheap to clone.
#[derive(Clone)]
pub struct QuizService {
    store: Arc<dyn QuizStore>,
    courses: Arc<dyn CourseDirectory>,
}

impl QuizService {
    pub fn new(store: Arc<dyn QuizStore>, courses: Arc<dyn CourseDirectory>) -> Self {
        Self { store, courses }
    }

    pub(crate) async fn require_quiz(&self, quiz_id: i64) -> Result<Quiz, AppError> {
        self.store
            .find_quiz(quiz_id)
            .await?
            .ok_or(AppError::NotFound("Quiz not found".to_string()))
    }
}
