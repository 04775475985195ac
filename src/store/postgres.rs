// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};

use crate::{
    error::AppError,
    models::{
        question::Question,
        quiz::{NewQuiz, Quiz},
        quiz_attempt::{AnswerSheet, AttemptCompletion, NewAttempt, QuestionResult, QuizAttempt},
    },
    store::{CourseDirectory, QuizStore},
};

const QUIZ_COLUMNS: &str = r#"
    id, course_id, created_by, title, description, questions,
    passing_score, time_limit, allowed_attempts, shuffle_questions,
    show_correct_answers, start_date, due_date, is_published,
    created_at, updated_at
"#;

const ATTEMPT_COLUMNS: &str = r#"
    id, quiz_id, user_id, attempt_number, answers, results,
    score, total_points, percentage, passed,
    started_at, completed_at, time_taken, is_auto_submitted
"#;

/// Postgres-backed store. Questions, answers and results live in JSONB columns.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row of the 'quizzes' table.
#[derive(FromRow)]
struct QuizRow {
    id: i64,
    course_id: i64,
    created_by: String,
    title: String,
    description: Option<String>,
    questions: Json<Vec<Question>>,
    passing_score: i32,
    time_limit: Option<i32>,
    allowed_attempts: i32,
    shuffle_questions: bool,
    show_correct_answers: bool,
    start_date: Option<DateTime<Utc>>,
    due_date: Option<DateTime<Utc>>,
    is_published: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<QuizRow> for Quiz {
    fn from(row: QuizRow) -> Self {
        Quiz {
            id: row.id,
            course_id: row.course_id,
            created_by: row.created_by,
            title: row.title,
            description: row.description,
            questions: row.questions.0,
            passing_score: row.passing_score,
            time_limit: row.time_limit,
            allowed_attempts: row.allowed_attempts,
            shuffle_questions: row.shuffle_questions,
            show_correct_answers: row.show_correct_answers,
            start_date: row.start_date,
            due_date: row.due_date,
            is_published: row.is_published,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Row of the 'quiz_attempts' table.
#[derive(FromRow)]
struct AttemptRow {
    id: i64,
    quiz_id: i64,
    user_id: String,
    attempt_number: i32,
    answers: Json<AnswerSheet>,
    results: Json<Vec<QuestionResult>>,
    score: i32,
    total_points: i32,
    percentage: i32,
    passed: bool,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    time_taken: Option<i64>,
    is_auto_submitted: bool,
}

impl From<AttemptRow> for QuizAttempt {
    fn from(row: AttemptRow) -> Self {
        QuizAttempt {
            id: row.id,
            quiz_id: row.quiz_id,
            user_id: row.user_id,
            attempt_number: row.attempt_number,
            answers: row.answers.0,
            results: row.results.0,
            score: row.score,
            total_points: row.total_points,
            percentage: row.percentage,
            passed: row.passed,
            started_at: row.started_at,
            completed_at: row.completed_at,
            time_taken: row.time_taken,
            is_auto_submitted: row.is_auto_submitted,
        }
    }
}

#[async_trait]
impl CourseDirectory for PgStore {
    async fn course_exists(&self, course_id: i64) -> Result<bool, AppError> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT id FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl QuizStore for PgStore {
    async fn insert_quiz(&self, quiz: NewQuiz) -> Result<Quiz, AppError> {
        let sql = format!(
            r#"
            INSERT INTO quizzes
            (course_id, created_by, title, description, questions, passing_score, time_limit,
             allowed_attempts, shuffle_questions, show_correct_answers, start_date, due_date, is_published)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {QUIZ_COLUMNS}
            "#
        );

        let row: QuizRow = sqlx::query_as(&sql)
            .bind(quiz.course_id)
            .bind(&quiz.created_by)
            .bind(&quiz.title)
            .bind(&quiz.description)
            .bind(Json(&quiz.questions))
            .bind(quiz.passing_score)
            .bind(quiz.time_limit)
            .bind(quiz.allowed_attempts)
            .bind(quiz.shuffle_questions)
            .bind(quiz.show_correct_answers)
            .bind(quiz.start_date)
            .bind(quiz.due_date)
            .bind(quiz.is_published)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert quiz: {:?}", e);
                AppError::from(e)
            })?;

        Ok(row.into())
    }

    async fn find_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError> {
        let sql = format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1");
        let row: Option<QuizRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Quiz::from))
    }

    async fn save_quiz(&self, quiz: &Quiz) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE quizzes SET
                title = $2, description = $3, questions = $4, passing_score = $5,
                time_limit = $6, allowed_attempts = $7, shuffle_questions = $8,
                show_correct_answers = $9, start_date = $10, due_date = $11,
                is_published = $12, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(quiz.id)
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(Json(&quiz.questions))
        .bind(quiz.passing_score)
        .bind(quiz.time_limit)
        .bind(quiz.allowed_attempts)
        .bind(quiz.shuffle_questions)
        .bind(quiz.show_correct_answers)
        .bind(quiz.start_date)
        .bind(quiz.due_date)
        .bind(quiz.is_published)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update quiz {}: {:?}", quiz.id, e);
            AppError::from(e)
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_quiz(&self, id: i64) -> Result<Option<u64>, AppError> {
        let mut tx = self.pool.begin().await?;

        let purged = sqlx::query("DELETE FROM quiz_attempts WHERE quiz_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(purged))
    }

    async fn list_quizzes(
        &self,
        course_id: i64,
        include_unpublished: bool,
    ) -> Result<Vec<Quiz>, AppError> {
        let sql = format!(
            r#"
            SELECT {QUIZ_COLUMNS} FROM quizzes
            WHERE course_id = $1 AND ($2 OR is_published)
            ORDER BY created_at ASC, id ASC
            "#
        );
        let rows: Vec<QuizRow> = sqlx::query_as(&sql)
            .bind(course_id)
            .bind(include_unpublished)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Quiz::from).collect())
    }

    async fn count_completed_attempts(&self, quiz_id: i64, user_id: &str) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM quiz_attempts
            WHERE quiz_id = $1 AND user_id = $2 AND completed_at IS NOT NULL
            "#,
        )
        .bind(quiz_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn find_open_attempt(
        &self,
        quiz_id: i64,
        user_id: &str,
    ) -> Result<Option<QuizAttempt>, AppError> {
        let sql = format!(
            r#"
            SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts
            WHERE quiz_id = $1 AND user_id = $2 AND completed_at IS NULL
            ORDER BY attempt_number DESC
            LIMIT 1
            "#
        );
        let row: Option<AttemptRow> = sqlx::query_as(&sql)
            .bind(quiz_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(QuizAttempt::from))
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> Result<QuizAttempt, AppError> {
        let sql = format!(
            r#"
            INSERT INTO quiz_attempts (quiz_id, user_id, attempt_number, total_points, started_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ATTEMPT_COLUMNS}
            "#
        );
        let row: AttemptRow = sqlx::query_as(&sql)
            .bind(attempt.quiz_id)
            .bind(&attempt.user_id)
            .bind(attempt.attempt_number)
            .bind(attempt.total_points)
            .bind(attempt.started_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                let err = AppError::from(e);
                if !matches!(err, AppError::Conflict(_)) {
                    tracing::error!("Failed to insert quiz attempt: {:?}", err);
                }
                err
            })?;
        Ok(row.into())
    }

    async fn find_attempt(&self, id: i64) -> Result<Option<QuizAttempt>, AppError> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE id = $1");
        let row: Option<AttemptRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(QuizAttempt::from))
    }

    async fn complete_attempt(
        &self,
        id: i64,
        completion: AttemptCompletion,
    ) -> Result<Option<QuizAttempt>, AppError> {
        // The `completed_at IS NULL` guard makes concurrent submissions race to a single winner.
        let sql = format!(
            r#"
            UPDATE quiz_attempts SET
                answers = $2, results = $3, score = $4, total_points = $5,
                percentage = $6, passed = $7, completed_at = $8, time_taken = $9,
                is_auto_submitted = $10
            WHERE id = $1 AND completed_at IS NULL
            RETURNING {ATTEMPT_COLUMNS}
            "#
        );
        let row: Option<AttemptRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(Json(&completion.answers))
            .bind(Json(&completion.results))
            .bind(completion.score)
            .bind(completion.total_points)
            .bind(completion.percentage)
            .bind(completion.passed)
            .bind(completion.completed_at)
            .bind(completion.time_taken)
            .bind(completion.is_auto_submitted)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to complete quiz attempt {}: {:?}", id, e);
                AppError::from(e)
            })?;
        Ok(row.map(QuizAttempt::from))
    }

    async fn list_completed_attempts(
        &self,
        quiz_id: i64,
        user_id: Option<&str>,
    ) -> Result<Vec<QuizAttempt>, AppError> {
        let sql = format!(
            r#"
            SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts
            WHERE quiz_id = $1
              AND completed_at IS NOT NULL
              AND ($2::TEXT IS NULL OR user_id = $2)
            ORDER BY completed_at DESC, id DESC
            "#
        );
        let rows: Vec<AttemptRow> = sqlx::query_as(&sql)
            .bind(quiz_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(QuizAttempt::from).collect())
    }
}
