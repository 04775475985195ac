// src/services/attempts.rs

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        quiz::Quiz,
        quiz_attempt::{
            AttemptCompletion, Eligibility, NewAttempt, QuizAttempt, SubmissionResponse,
            SubmitAttemptRequest,
        },
    },
    services::{QuizService, grading::grade_quiz},
};

/// Attempt-cap policy over the number of completed attempts.
pub fn eligibility(quiz: &Quiz, completed_count: i64) -> Eligibility {
    if quiz.allowed_attempts > 0 && completed_count >= i64::from(quiz.allowed_attempts) {
        return Eligibility {
            allowed: false,
            reason: Some(format!(
                "Maximum attempts ({}) reached for this quiz",
                quiz.allowed_attempts
            )),
            attempt_count: completed_count,
        };
    }
    Eligibility {
        allowed: true,
        reason: None,
        attempt_count: completed_count,
    }
}

/// Rejects starts outside the quiz's `[startDate, dueDate]` window.
fn check_window(quiz: &Quiz, now: DateTime<Utc>) -> Result<(), AppError> {
    if let Some(start) = quiz.start_date {
        if now < start {
            return Err(AppError::Forbidden(format!(
                "This quiz opens at {}",
                start.to_rfc3339()
            )));
        }
    }
    if let Some(due) = quiz.due_date {
        if now > due {
            return Err(AppError::Forbidden(format!(
                "This quiz closed at {}",
                due.to_rfc3339()
            )));
        }
    }
    Ok(())
}

impl QuizService {
    pub(crate) async fn eligibility_for(
        &self,
        quiz: &Quiz,
        user_id: &str,
    ) -> Result<Eligibility, AppError> {
        let completed = self.store.count_completed_attempts(quiz.id, user_id).await?;
        Ok(eligibility(quiz, completed))
    }

    /// Whether `user_id` may start another attempt on the quiz.
    pub async fn can_user_take_quiz(
        &self,
        quiz_id: i64,
        user_id: &str,
    ) -> Result<Eligibility, AppError> {
        let quiz = self.require_quiz(quiz_id).await?;
        self.eligibility_for(&quiz, user_id).await
    }

    /// Opens a new attempt, or hands back the one already in flight.
    pub async fn start_attempt(&self, quiz_id: i64, user_id: &str) -> Result<QuizAttempt, AppError> {
        self.start_attempt_at(quiz_id, user_id, Utc::now()).await
    }

    pub(crate) async fn start_attempt_at(
        &self,
        quiz_id: i64,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<QuizAttempt, AppError> {
        let quiz = self.require_quiz(quiz_id).await?;
        if !quiz.is_published {
            return Err(AppError::Forbidden("This quiz is not published".to_string()));
        }
        check_window(&quiz, now)?;

        if let Some(open) = self.store.find_open_attempt(quiz_id, user_id).await? {
            tracing::debug!(quiz_id, attempt_id = open.id, "Resuming open attempt");
            return Ok(open);
        }

        let eligibility = self.eligibility_for(&quiz, user_id).await?;
        if !eligibility.allowed {
            return Err(AppError::Forbidden(eligibility.reason.unwrap_or_default()));
        }

        let new_attempt = NewAttempt {
            quiz_id,
            user_id: user_id.to_string(),
            attempt_number: eligibility.attempt_count as i32 + 1,
            total_points: quiz.total_points(),
            started_at: now,
        };

        match self.store.insert_attempt(new_attempt).await {
            Ok(attempt) => {
                tracing::info!(
                    quiz_id,
                    attempt_id = attempt.id,
                    attempt_number = attempt.attempt_number,
                    "Quiz attempt started"
                );
                Ok(attempt)
            }
            Err(AppError::Conflict(detail)) => {
                tracing::warn!(quiz_id, user_id, %detail, "Concurrent attempt start rejected");
                Err(AppError::Conflict(
                    "An attempt for this quiz is already in progress, please try again".to_string(),
                ))
            }
            Err(e) => Err(e),
        }
    }

    /// Grades and completes an open attempt. This is the only write an attempt ever receives.
    pub async fn submit_attempt(
        &self,
        attempt_id: i64,
        user_id: &str,
        req: SubmitAttemptRequest,
    ) -> Result<SubmissionResponse, AppError> {
        self.submit_attempt_at(attempt_id, user_id, req, Utc::now()).await
    }

    pub(crate) async fn submit_attempt_at(
        &self,
        attempt_id: i64,
        user_id: &str,
        req: SubmitAttemptRequest,
        now: DateTime<Utc>,
    ) -> Result<SubmissionResponse, AppError> {
        let attempt = self
            .store
            .find_attempt(attempt_id)
            .await?
            .ok_or(AppError::NotFound("Quiz attempt not found".to_string()))?;

        if attempt.user_id != user_id {
            return Err(AppError::Forbidden(
                "You can only submit your own attempts".to_string(),
            ));
        }
        if attempt.is_completed() {
            return Err(already_submitted());
        }

        let quiz = self.require_quiz(attempt.quiz_id).await?;

        let elapsed = now - attempt.started_at;
        if let Some(limit) = quiz.time_limit {
            let elapsed_minutes = elapsed.num_milliseconds() as f64 / 60_000.0;
            if !req.is_auto_submitted && elapsed_minutes > f64::from(limit) {
                tracing::warn!(
                    attempt_id,
                    elapsed_minutes,
                    time_limit = limit,
                    "Late manual submission rejected"
                );
                return Err(AppError::BadRequest(format!(
                    "Time limit of {} minutes exceeded",
                    limit
                )));
            }
        }

        // Graded against the quiz as it exists now, not as it was at start.
        let outcome = grade_quiz(&quiz, &req.answers);
        let passed = outcome.passed(quiz.passing_score);

        let completion = AttemptCompletion {
            answers: req.answers,
            results: outcome.results,
            score: outcome.score,
            total_points: outcome.total_points,
            percentage: outcome.percentage,
            passed,
            completed_at: now,
            time_taken: elapsed.num_seconds().max(0),
            is_auto_submitted: req.is_auto_submitted,
        };

        let completed = self
            .store
            .complete_attempt(attempt_id, completion)
            .await?
            .ok_or_else(already_submitted)?;

        tracing::info!(
            quiz_id = quiz.id,
            attempt_id,
            score = completed.score,
            percentage = completed.percentage,
            passed = completed.passed,
            auto_submitted = completed.is_auto_submitted,
            "Quiz attempt submitted"
        );

        Ok(SubmissionResponse {
            attempt: completed,
            passing_score: quiz.passing_score,
            show_correct_answers: quiz.show_correct_answers,
        })
    }

    /// The caller's own completed attempts on a quiz, most recent first.
    pub async fn attempt_history(
        &self,
        quiz_id: i64,
        user_id: &str,
    ) -> Result<Vec<QuizAttempt>, AppError> {
        self.require_quiz(quiz_id).await?;
        self.store.list_completed_attempts(quiz_id, Some(user_id)).await
    }

    /// A single attempt, visible to its owner only.
    pub async fn get_attempt(&self, attempt_id: i64, user_id: &str) -> Result<QuizAttempt, AppError> {
        let attempt = self
            .store
            .find_attempt(attempt_id)
            .await?
            .ok_or(AppError::NotFound("Quiz attempt not found".to_string()))?;

        if attempt.user_id != user_id {
            return Err(AppError::Forbidden(
                "You can only view your own attempts".to_string(),
            ));
        }
        Ok(attempt)
    }
}

fn already_submitted() -> AppError {
    AppError::BadRequest("This quiz attempt has already been submitted".to_string())
}
