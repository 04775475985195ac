// src/services/statistics.rs

use std::collections::HashSet;

use crate::{
    error::AppError,
    models::{
        quiz_attempt::{QuizAttempt, QuizStatistics},
        user::AuthUser,
    },
    services::QuizService,
};

/// Aggregates completed attempts. An empty slice yields all zeros.
pub fn summarize(attempts: &[QuizAttempt]) -> QuizStatistics {
    if attempts.is_empty() {
        return QuizStatistics::default();
    }

    let total = attempts.len() as f64;
    let unique_users: HashSet<&str> = attempts.iter().map(|a| a.user_id.as_str()).collect();
    let score_sum: i64 = attempts.iter().map(|a| i64::from(a.score)).sum();
    let percentage_sum: i64 = attempts.iter().map(|a| i64::from(a.percentage)).sum();
    let passed = attempts.iter().filter(|a| a.passed).count();

    QuizStatistics {
        total_attempts: attempts.len() as i64,
        unique_users: unique_users.len() as i64,
        average_score: (score_sum as f64 / total).round() as i64,
        average_percentage: (percentage_sum as f64 / total).round() as i64,
        pass_rate: (passed as f64 / total * 100.0).round() as i64,
        highest_score: attempts.iter().map(|a| a.score).max().unwrap_or(0),
        lowest_score: attempts.iter().map(|a| a.score).min().unwrap_or(0),
    }
}

impl QuizService {
    /// Statistics over every completed attempt. Creator or admin only.
    pub async fn quiz_statistics(
        &self,
        quiz_id: i64,
        requester: &AuthUser,
    ) -> Result<QuizStatistics, AppError> {
        let quiz = self.require_quiz(quiz_id).await?;
        if !(requester.is_admin() || quiz.is_owned_by(&requester.id)) {
            return Err(AppError::Forbidden(
                "Only the quiz creator can view its statistics".to_string(),
            ));
        }

        let attempts = self.store.list_completed_attempts(quiz_id, None).await?;
        Ok(summarize(&attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            question::AnswerValue,
            quiz_attempt::{AnswerSheet, SubmitAttemptRequest},
            user::Role,
        },
        services::test_support::{INSTRUCTOR, published_quiz, service},
    };
    use chrono::Utc;

    fn attempt(user: &str, score: i32, percentage: i32, passed: bool) -> QuizAttempt {
        QuizAttempt {
            id: 0,
            quiz_id: 1,
            user_id: user.to_string(),
            attempt_number: 1,
            answers: AnswerSheet::new(),
            results: Vec::new(),
            score,
            total_points: 10,
            percentage,
            passed,
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            time_taken: Some(60),
            is_auto_submitted: false,
        }
    }

    #[test]
    fn test_summarize_empty() {
        assert_eq!(summarize(&[]), QuizStatistics::default());
    }

    #[test]
    fn test_summarize_mixed() {
        let stats = summarize(&[
            attempt("a", 10, 100, true),
            attempt("a", 5, 50, false),
            attempt("b", 8, 80, true),
        ]);

        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.unique_users, 2);
        assert_eq!(stats.average_score, 8); // 23 / 3 = 7.67
        assert_eq!(stats.average_percentage, 77);
        assert_eq!(stats.pass_rate, 67);
        assert_eq!(stats.highest_score, 10);
        assert_eq!(stats.lowest_score, 5);
    }

    #[tokio::test]
    async fn test_statistics_ignore_open_attempts_and_check_access() {
        let (service, _) = service();
        let quiz = published_quiz(&service, |_| {}).await;

        let finished = service.start_attempt(quiz.id, "s1").await.unwrap();
        let mut sheet = AnswerSheet::new();
        sheet.insert("q1".into(), AnswerValue::Text("Paris".into()));
        service
            .submit_attempt(
                finished.id,
                "s1",
                SubmitAttemptRequest {
                    answers: sheet,
                    is_auto_submitted: false,
                },
            )
            .await
            .unwrap();
        service.start_attempt(quiz.id, "s2").await.unwrap();

        let owner = AuthUser { id: INSTRUCTOR.into(), role: Role::Instructor };
        let stats = service.quiz_statistics(quiz.id, &owner).await.unwrap();
        assert_eq!(stats.total_attempts, 1);
        assert_eq!(stats.unique_users, 1);
        assert_eq!(stats.highest_score, 5);
        assert_eq!(stats.pass_rate, 0);

        let admin = AuthUser { id: "root".into(), role: Role::Admin };
        assert!(service.quiz_statistics(quiz.id, &admin).await.is_ok());

        let other = AuthUser { id: "other_instructor".into(), role: Role::Instructor };
        assert!(matches!(
            service.quiz_statistics(quiz.id, &other).await,
            Err(AppError::Forbidden(_))
        ));
    }
}
