// src/handlers/docs.rs

use axum::{Json, response::IntoResponse};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{
    handlers::{attempt, health, quiz},
    models::{
        question::{AnswerValue, PublicQuestion, Question, QuestionType},
        quiz::{CourseQuiz, CreateQuizRequest, Quiz, QuizDetail, QuizForTaking, UpdateQuizRequest},
        quiz_attempt::{
            Eligibility, QuestionResult, QuizAttempt, QuizStatistics, SubmissionResponse,
            SubmitAttemptRequest,
        },
    },
};

struct SecurityAddon;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        quiz::create_quiz,
        quiz::list_course_quizzes,
        quiz::get_quiz,
        quiz::update_quiz,
        quiz::delete_quiz,
        quiz::get_quiz_for_taking,
        quiz::get_statistics,
        attempt::can_take_quiz,
        attempt::start_attempt,
        attempt::list_my_attempts,
        attempt::submit_attempt,
        attempt::get_attempt,
    ),
    components(schemas(
        Question,
        QuestionType,
        PublicQuestion,
        AnswerValue,
        Quiz,
        QuizDetail,
        CourseQuiz,
        QuizForTaking,
        CreateQuizRequest,
        UpdateQuizRequest,
        QuizAttempt,
        QuestionResult,
        SubmitAttemptRequest,
        SubmissionResponse,
        Eligibility,
        QuizStatistics,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "quizzes", description = "Quiz authoring and delivery"),
        (name = "attempts", description = "Attempt lifecycle and grading"),
    )
)]
pub struct ApiDoc;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Serves the generated OpenAPI document.
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_quiz_routes() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let paths = doc["paths"].as_object().unwrap();
        assert!(paths.contains_key("/api/quizzes/{id}/start"));
        assert!(paths.contains_key("/api/quizzes/attempts/{attempt_id}/submit"));
        assert!(doc["components"]["securitySchemes"]["token"].is_object());
    }
}
