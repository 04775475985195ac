// src/services/grading.rs

use crate::models::{
    question::{AnswerValue, Question, QuestionKind},
    quiz::Quiz,
    quiz_attempt::{AnswerSheet, QuestionResult},
};

/// Result of grading one answer sheet against a quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
    pub score: i32,
    pub total_points: i32,
    pub percentage: i32,
    pub results: Vec<QuestionResult>,
}

impl GradeOutcome {
    pub fn passed(&self, passing_score: i32) -> bool {
        self.percentage >= passing_score
    }
}

/// Decides whether `answer` is correct for `question`.
///
/// Missing answers and answers of the wrong shape are simply incorrect.
pub fn check_answer(question: &Question, answer: Option<&AnswerValue>) -> bool {
    let Some(answer) = answer else {
        return false;
    };

    match (&question.kind, answer) {
        (
            QuestionKind::MultipleChoice { correct_answer, .. }
            | QuestionKind::OneChoiceAnswer { correct_answer, .. },
            AnswerValue::Text(given),
        ) => given == correct_answer,
        (QuestionKind::TrueFalse { correct_answer }, AnswerValue::Bool(given)) => {
            given == correct_answer
        }
        (QuestionKind::FillBlank { correct_answer }, AnswerValue::Text(given)) => {
            normalize_blank(given) == normalize_blank(correct_answer)
        }
        _ => false,
    }
}

fn normalize_blank(text: &str) -> String {
    text.trim().to_lowercase()
}

/// `round(score / total * 100)`, or 0 when there is nothing to score.
pub fn percentage(score: i32, total_points: i32) -> i32 {
    if total_points <= 0 {
        return 0;
    }
    ((score as f64 / total_points as f64) * 100.0).round() as i32
}

/// Grades every question of `quiz` in stored order.
pub fn grade_quiz(quiz: &Quiz, answers: &AnswerSheet) -> GradeOutcome {
    let mut score: i32 = 0;
    let mut total_points: i32 = 0;
    let mut results = Vec::with_capacity(quiz.questions.len());

    for question in &quiz.questions {
        let user_answer = answers
            .get(&question.id)
            .filter(|a| !matches!(a, AnswerValue::Other(serde_json::Value::Null)));
        let is_correct = check_answer(question, user_answer);
        let awarded = if is_correct { question.points } else { 0 };

        score = score.saturating_add(awarded);
        total_points = total_points.saturating_add(question.points);
        results.push(QuestionResult {
            question_id: question.id.clone(),
            user_answer: user_answer.cloned(),
            correct_answer: question.kind.correct_answer(),
            is_correct,
            points: awarded,
            max_points: question.points,
        });
    }

    GradeOutcome {
        score,
        total_points,
        percentage: percentage(score, total_points),
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn text(s: &str) -> AnswerValue {
        AnswerValue::Text(s.to_string())
    }

    fn quiz_with(questions: Vec<Question>, passing_score: i32) -> Quiz {
        let now = Utc::now();
        Quiz {
            id: 1,
            course_id: 1,
            created_by: "instructor".into(),
            title: "Quiz".into(),
            description: None,
            questions,
            passing_score,
            time_limit: None,
            allowed_attempts: 0,
            shuffle_questions: false,
            show_correct_answers: true,
            start_date: None,
            due_date: None,
            is_published: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn geography_quiz() -> Quiz {
        quiz_with(
            vec![
                Question::multiple_choice(
                    "q1",
                    "Capital of France?",
                    vec!["Paris".into(), "Rome".into(), "Berlin".into()],
                    "Paris",
                    5,
                )
                .unwrap(),
                Question::true_false("q2", "The earth is round", true, 5).unwrap(),
            ],
            70,
        )
    }

    fn sheet(entries: &[(&str, AnswerValue)]) -> AnswerSheet {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_fill_blank_ignores_case_and_whitespace() {
        let q = Question::fill_blank("q", "Capital of France?", "Paris", 1).unwrap();
        assert!(check_answer(&q, Some(&text(" paris "))));
        assert!(!check_answer(&q, Some(&text("Lyon"))));
    }

    #[test]
    fn test_true_false_exact() {
        let q = Question::true_false("q", "True?", true, 1).unwrap();
        assert!(!check_answer(&q, Some(&AnswerValue::Bool(false))));
        assert!(check_answer(&q, Some(&AnswerValue::Bool(true))));
    }

    #[test]
    fn test_multiple_choice_is_case_sensitive() {
        let q = Question::multiple_choice(
            "q",
            "Pick",
            vec!["A".into(), "B".into(), "C".into()],
            "B",
            1,
        )
        .unwrap();
        assert!(!check_answer(&q, Some(&text("b"))));
        assert!(!check_answer(&q, Some(&text(" B"))));
        assert!(check_answer(&q, Some(&text("B"))));
    }

    #[test]
    fn test_missing_or_mistyped_answers_are_wrong() {
        let tf = Question::true_false("q", "True?", true, 1).unwrap();
        let blank = Question::fill_blank("q", "Word?", "true", 1).unwrap();

        assert!(!check_answer(&tf, None));
        assert!(!check_answer(&tf, Some(&text("true"))));
        assert!(!check_answer(&blank, Some(&AnswerValue::Bool(true))));
        assert!(!check_answer(&blank, Some(&AnswerValue::Other(json!({"x": 1})))));
    }

    #[test]
    fn test_grade_all_correct() {
        let quiz = geography_quiz();
        let outcome = grade_quiz(&quiz, &sheet(&[("q1", text("Paris")), ("q2", AnswerValue::Bool(true))]));

        assert_eq!(outcome.score, 10);
        assert_eq!(outcome.total_points, 10);
        assert_eq!(outcome.percentage, 100);
        assert!(outcome.passed(quiz.passing_score));
    }

    #[test]
    fn test_grade_half_correct_fails() {
        let quiz = geography_quiz();
        let outcome = grade_quiz(&quiz, &sheet(&[("q1", text("Rome")), ("q2", AnswerValue::Bool(true))]));

        assert_eq!(outcome.score, 5);
        assert_eq!(outcome.percentage, 50);
        assert!(!outcome.passed(quiz.passing_score));
        assert!(!outcome.results[0].is_correct);
        assert_eq!(outcome.results[0].correct_answer, text("Paris"));
        assert_eq!(outcome.results[0].user_answer, Some(text("Rome")));
    }

    #[test]
    fn test_grade_unanswered_contributes_zero() {
        let quiz = geography_quiz();
        let outcome = grade_quiz(&quiz, &AnswerSheet::new());

        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.percentage, 0);
        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.results.iter().all(|r| r.user_answer.is_none() && r.points == 0));
    }

    #[test]
    fn test_null_answer_counts_as_unanswered() {
        let quiz = geography_quiz();
        let outcome = grade_quiz(&quiz, &sheet(&[("q1", AnswerValue::Other(serde_json::Value::Null))]));
        assert_eq!(outcome.results[0].user_answer, None);
    }

    #[test]
    fn test_results_follow_stored_order_and_ignore_unknown_ids() {
        let quiz = geography_quiz();
        let outcome = grade_quiz(
            &quiz,
            &sheet(&[("zzz", text("Paris")), ("q2", AnswerValue::Bool(true))]),
        );
        let ids: Vec<&str> = outcome.results.iter().map(|r| r.question_id.as_str()).collect();
        assert_eq!(ids, ["q1", "q2"]);
        assert_eq!(outcome.score, 5);
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn test_pass_threshold_is_inclusive() {
        let questions = vec![
            Question::true_false("a", "A", true, 1).unwrap(),
            Question::true_false("b", "B", true, 1).unwrap(),
        ];
        let quiz = quiz_with(questions, 50);
        let outcome = grade_quiz(&quiz, &sheet(&[("a", AnswerValue::Bool(true))]));
        assert_eq!(outcome.percentage, 50);
        assert!(outcome.passed(quiz.passing_score));
    }

    #[test]
    fn test_grading_is_deterministic() {
        let quiz = geography_quiz();
        let answers = sheet(&[("q1", text("Paris")), ("q2", AnswerValue::Bool(false))]);
        let first = grade_quiz(&quiz, &answers);
        for _ in 0..10 {
            assert_eq!(grade_quiz(&quiz, &answers), first);
        }
    }
}
