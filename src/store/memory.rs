// src/store/memory.rs

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    error::AppError,
    models::{
        quiz::{NewQuiz, Quiz},
        quiz_attempt::{AttemptCompletion, NewAttempt, QuizAttempt},
    },
    store::{CourseDirectory, QuizStore},
};

/// In-process store with the same guarantees as the Postgres one.
///
/// A single lock serialises every operation, which gives the uniqueness
/// check, completion CAS and cascade delete their atomicity.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_quiz_id: i64,
    next_attempt_id: i64,
    quizzes: BTreeMap<i64, Quiz>,
    attempts: BTreeMap<i64, QuizAttempt>,
    courses: HashSet<i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_courses(course_ids: impl IntoIterator<Item = i64>) -> Self {
        MemoryStore {
            inner: Mutex::new(Inner {
                courses: course_ids.into_iter().collect(),
                ..Inner::default()
            }),
        }
    }

    /// Number of attempts (open or completed) referencing a quiz.
    pub async fn attempt_count_for_quiz(&self, quiz_id: i64) -> usize {
        let inner = self.inner.lock().await;
        inner.attempts.values().filter(|a| a.quiz_id == quiz_id).count()
    }
}

#[async_trait]
impl CourseDirectory for MemoryStore {
    async fn course_exists(&self, course_id: i64) -> Result<bool, AppError> {
        Ok(self.inner.lock().await.courses.contains(&course_id))
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn insert_quiz(&self, new: NewQuiz) -> Result<Quiz, AppError> {
        let mut inner = self.inner.lock().await;
        inner.next_quiz_id += 1;
        let now = Utc::now();
        let quiz = Quiz {
            id: inner.next_quiz_id,
            course_id: new.course_id,
            created_by: new.created_by,
            title: new.title,
            description: new.description,
            questions: new.questions,
            passing_score: new.passing_score,
            time_limit: new.time_limit,
            allowed_attempts: new.allowed_attempts,
            shuffle_questions: new.shuffle_questions,
            show_correct_answers: new.show_correct_answers,
            start_date: new.start_date,
            due_date: new.due_date,
            is_published: new.is_published,
            created_at: now,
            updated_at: now,
        };
        inner.quizzes.insert(quiz.id, quiz.clone());
        Ok(quiz)
    }

    async fn find_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError> {
        Ok(self.inner.lock().await.quizzes.get(&id).cloned())
    }

    async fn save_quiz(&self, quiz: &Quiz) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().await;
        match inner.quizzes.get_mut(&quiz.id) {
            Some(stored) => {
                *stored = Quiz {
                    updated_at: Utc::now(),
                    ..quiz.clone()
                };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_quiz(&self, id: i64) -> Result<Option<u64>, AppError> {
        let mut inner = self.inner.lock().await;
        if inner.quizzes.remove(&id).is_none() {
            return Ok(None);
        }
        let before = inner.attempts.len();
        inner.attempts.retain(|_, a| a.quiz_id != id);
        Ok(Some((before - inner.attempts.len()) as u64))
    }

    async fn list_quizzes(
        &self,
        course_id: i64,
        include_unpublished: bool,
    ) -> Result<Vec<Quiz>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .quizzes
            .values()
            .filter(|q| q.course_id == course_id && (include_unpublished || q.is_published))
            .cloned()
            .collect())
    }

    async fn count_completed_attempts(&self, quiz_id: i64, user_id: &str) -> Result<i64, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .attempts
            .values()
            .filter(|a| a.quiz_id == quiz_id && a.user_id == user_id && a.is_completed())
            .count() as i64)
    }

    async fn find_open_attempt(
        &self,
        quiz_id: i64,
        user_id: &str,
    ) -> Result<Option<QuizAttempt>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .attempts
            .values()
            .filter(|a| a.quiz_id == quiz_id && a.user_id == user_id && !a.is_completed())
            .max_by_key(|a| a.attempt_number)
            .cloned())
    }

    async fn insert_attempt(&self, new: NewAttempt) -> Result<QuizAttempt, AppError> {
        let mut inner = self.inner.lock().await;
        if !inner.quizzes.contains_key(&new.quiz_id) {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }
        let duplicate = inner.attempts.values().any(|a| {
            a.quiz_id == new.quiz_id
                && a.user_id == new.user_id
                && a.attempt_number == new.attempt_number
        });
        if duplicate {
            return Err(AppError::Conflict(
                "duplicate (user_id, quiz_id, attempt_number)".to_string(),
            ));
        }

        inner.next_attempt_id += 1;
        let attempt = QuizAttempt {
            id: inner.next_attempt_id,
            quiz_id: new.quiz_id,
            user_id: new.user_id,
            attempt_number: new.attempt_number,
            answers: Default::default(),
            results: Vec::new(),
            score: 0,
            total_points: new.total_points,
            percentage: 0,
            passed: false,
            started_at: new.started_at,
            completed_at: None,
            time_taken: None,
            is_auto_submitted: false,
        };
        inner.attempts.insert(attempt.id, attempt.clone());
        Ok(attempt)
    }

    async fn find_attempt(&self, id: i64) -> Result<Option<QuizAttempt>, AppError> {
        Ok(self.inner.lock().await.attempts.get(&id).cloned())
    }

    async fn complete_attempt(
        &self,
        id: i64,
        completion: AttemptCompletion,
    ) -> Result<Option<QuizAttempt>, AppError> {
        let mut inner = self.inner.lock().await;
        let Some(attempt) = inner.attempts.get_mut(&id) else {
            return Ok(None);
        };
        if attempt.is_completed() {
            return Ok(None);
        }

        attempt.answers = completion.answers;
        attempt.results = completion.results;
        attempt.score = completion.score;
        attempt.total_points = completion.total_points;
        attempt.percentage = completion.percentage;
        attempt.passed = completion.passed;
        attempt.completed_at = Some(completion.completed_at);
        attempt.time_taken = Some(completion.time_taken);
        attempt.is_auto_submitted = completion.is_auto_submitted;
        Ok(Some(attempt.clone()))
    }

    async fn list_completed_attempts(
        &self,
        quiz_id: i64,
        user_id: Option<&str>,
    ) -> Result<Vec<QuizAttempt>, AppError> {
        let inner = self.inner.lock().await;
        let mut attempts: Vec<QuizAttempt> = inner
            .attempts
            .values()
            .filter(|a| a.quiz_id == quiz_id && a.is_completed())
            .filter(|a| user_id.is_none_or(|uid| a.user_id == uid))
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(b.id.cmp(&a.id)));
        Ok(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Question;

    fn new_quiz() -> NewQuiz {
        NewQuiz {
            course_id: 1,
            created_by: "instructor".to_string(),
            title: "Quiz".to_string(),
            description: None,
            questions: vec![Question::true_false("q1", "True?", true, 1).unwrap()],
            passing_score: 50,
            time_limit: None,
            allowed_attempts: 0,
            shuffle_questions: false,
            show_correct_answers: true,
            start_date: None,
            due_date: None,
            is_published: true,
        }
    }

    fn new_attempt(quiz_id: i64, number: i32) -> NewAttempt {
        NewAttempt {
            quiz_id,
            user_id: "student".to_string(),
            attempt_number: number,
            total_points: 1,
            started_at: Utc::now(),
        }
    }

    fn completion() -> AttemptCompletion {
        AttemptCompletion {
            answers: Default::default(),
            results: Vec::new(),
            score: 0,
            total_points: 1,
            percentage: 0,
            passed: false,
            completed_at: Utc::now(),
            time_taken: 3,
            is_auto_submitted: false,
        }
    }

    #[tokio::test]
    async fn test_duplicate_attempt_number_conflicts() {
        let store = MemoryStore::new();
        let quiz = store.insert_quiz(new_quiz()).await.unwrap();

        store.insert_attempt(new_attempt(quiz.id, 1)).await.unwrap();
        let second = store.insert_attempt(new_attempt(quiz.id, 1)).await;
        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_complete_is_compare_and_set() {
        let store = MemoryStore::new();
        let quiz = store.insert_quiz(new_quiz()).await.unwrap();
        let attempt = store.insert_attempt(new_attempt(quiz.id, 1)).await.unwrap();

        assert!(store.complete_attempt(attempt.id, completion()).await.unwrap().is_some());
        assert!(store.complete_attempt(attempt.id, completion()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_cascades_attempts() {
        let store = MemoryStore::new();
        let quiz = store.insert_quiz(new_quiz()).await.unwrap();
        store.insert_attempt(new_attempt(quiz.id, 1)).await.unwrap();
        store.insert_attempt(new_attempt(quiz.id, 2)).await.unwrap();

        assert_eq!(store.delete_quiz(quiz.id).await.unwrap(), Some(2));
        assert_eq!(store.attempt_count_for_quiz(quiz.id).await, 0);
        assert_eq!(store.delete_quiz(quiz.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_with_courses_registers_ids() {
        let store = MemoryStore::with_courses([3, 4]);
        assert!(store.course_exists(3).await.unwrap());
        assert!(!store.course_exists(5).await.unwrap());
    }
}
