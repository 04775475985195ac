// src/handlers/attempt.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{
        quiz_attempt::{Eligibility, QuizAttempt, SubmissionResponse, SubmitAttemptRequest},
        user::AuthUser,
    },
    services::QuizService,
};

/// Whether the caller may start another attempt.
#[utoipa::path(
    get,
    path = "/api/quizzes/{id}/can-take",
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = OK, body = Eligibility),
        (status = NOT_FOUND, description = "Quiz not found"),
    ),
    tag = "attempts",
    security(("token" = []))
)]
pub async fn can_take_quiz(
    State(service): State<QuizService>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let eligibility = service.can_user_take_quiz(id, &user.id).await?;
    Ok(Json(eligibility))
}

/// Starts an attempt, or returns the caller's attempt that is still open.
#[utoipa::path(
    post,
    path = "/api/quizzes/{id}/start",
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = CREATED, body = QuizAttempt),
        (status = FORBIDDEN, description = "Unpublished, outside the schedule or no attempts left"),
        (status = NOT_FOUND, description = "Quiz not found"),
        (status = CONFLICT, description = "Concurrent start"),
    ),
    tag = "attempts",
    security(("token" = []))
)]
pub async fn start_attempt(
    State(service): State<QuizService>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = service.start_attempt(id, &user.id).await?;
    Ok((StatusCode::CREATED, Json(attempt)))
}

/// The caller's completed attempts on a quiz, most recent first.
#[utoipa::path(
    get,
    path = "/api/quizzes/{id}/attempts",
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = OK, body = Vec<QuizAttempt>),
        (status = NOT_FOUND, description = "Quiz not found"),
    ),
    tag = "attempts",
    security(("token" = []))
)]
pub async fn list_my_attempts(
    State(service): State<QuizService>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = service.attempt_history(id, &user.id).await?;
    Ok(Json(attempts))
}

/// Submits answers and returns the graded attempt.
#[utoipa::path(
    post,
    path = "/api/quizzes/attempts/{attempt_id}/submit",
    params(("attempt_id" = i64, Path, description = "Attempt id")),
    request_body = SubmitAttemptRequest,
    responses(
        (status = OK, body = SubmissionResponse),
        (status = BAD_REQUEST, description = "Already submitted or time limit exceeded"),
        (status = FORBIDDEN, description = "Attempt belongs to another user"),
        (status = NOT_FOUND, description = "Attempt not found"),
    ),
    tag = "attempts",
    security(("token" = []))
)]
pub async fn submit_attempt(
    State(service): State<QuizService>,
    Extension(user): Extension<AuthUser>,
    Path(attempt_id): Path<i64>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let graded = service.submit_attempt(attempt_id, &user.id, payload).await?;
    Ok(Json(graded))
}

/// A single attempt of the caller.
#[utoipa::path(
    get,
    path = "/api/quizzes/attempts/{attempt_id}",
    params(("attempt_id" = i64, Path, description = "Attempt id")),
    responses(
        (status = OK, body = QuizAttempt),
        (status = FORBIDDEN, description = "Attempt belongs to another user"),
        (status = NOT_FOUND, description = "Attempt not found"),
    ),
    tag = "attempts",
    security(("token" = []))
)]
pub async fn get_attempt(
    State(service): State<QuizService>,
    Extension(user): Extension<AuthUser>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = service.get_attempt(attempt_id, &user.id).await?;
    Ok(Json(attempt))
}
