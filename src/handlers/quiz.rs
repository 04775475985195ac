// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppError,
    models::{
        quiz::{CourseQuiz, CreateQuizRequest, Quiz, QuizForTaking, UpdateQuizRequest},
        quiz_attempt::QuizStatistics,
        user::AuthUser,
    },
    services::QuizService,
    utils::jwt::MaybeUser,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListQuizzesQuery {
    /// Honored for instructors and admins only.
    pub include_unpublished: Option<bool>,
}

/// Creates a new quiz. Instructors and admins only.
#[utoipa::path(
    post,
    path = "/api/quizzes",
    request_body = CreateQuizRequest,
    responses(
        (status = CREATED, body = Quiz, description = "Quiz created"),
        (status = BAD_REQUEST, description = "Validation failed"),
        (status = FORBIDDEN, description = "Caller is not an instructor"),
        (status = NOT_FOUND, description = "Course does not exist"),
    ),
    tag = "quizzes",
    security(("token" = []))
)]
pub async fn create_quiz(
    State(service): State<QuizService>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require_elevated()?;
    let quiz = service.create_quiz(payload, &user.id).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Lists the quizzes of a course.
///
/// Authenticated callers also get their own completed attempts per quiz.
#[utoipa::path(
    get,
    path = "/api/quizzes/course/{course_id}",
    params(("course_id" = i64, Path, description = "Course id"), ListQuizzesQuery),
    responses((status = OK, body = Vec<CourseQuiz>)),
    tag = "quizzes"
)]
pub async fn list_course_quizzes(
    State(service): State<QuizService>,
    MaybeUser(user): MaybeUser,
    Path(course_id): Path<i64>,
    Query(query): Query<ListQuizzesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let include_unpublished = query.include_unpublished.unwrap_or(false)
        && user.as_ref().is_some_and(AuthUser::is_elevated);

    let quizzes = service
        .list_course_quizzes(course_id, user.as_ref().map(|u| u.id.as_str()), include_unpublished)
        .await?;
    Ok(Json(quizzes))
}

/// Fetches a quiz with its answer keys.
#[utoipa::path(
    get,
    path = "/api/quizzes/{id}",
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = OK, body = Quiz),
        (status = FORBIDDEN, description = "Unpublished and caller is not the creator"),
        (status = NOT_FOUND, description = "Quiz not found"),
    ),
    tag = "quizzes"
)]
pub async fn get_quiz(
    State(service): State<QuizService>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = service.get_quiz_by_id(id, user.as_ref()).await?;
    Ok(Json(quiz))
}

/// Partially updates a quiz. Creator only.
#[utoipa::path(
    put,
    path = "/api/quizzes/{id}",
    params(("id" = i64, Path, description = "Quiz id")),
    request_body = UpdateQuizRequest,
    responses(
        (status = OK, body = Quiz),
        (status = BAD_REQUEST, description = "Validation failed"),
        (status = FORBIDDEN, description = "Caller is not the creator"),
        (status = NOT_FOUND, description = "Quiz not found"),
    ),
    tag = "quizzes",
    security(("token" = []))
)]
pub async fn update_quiz(
    State(service): State<QuizService>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = service.update_quiz(id, payload, &user.id).await?;
    Ok(Json(quiz))
}

/// Deletes a quiz and every attempt on it. Creator only.
#[utoipa::path(
    delete,
    path = "/api/quizzes/{id}",
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = NO_CONTENT, description = "Quiz deleted"),
        (status = FORBIDDEN, description = "Caller is not the creator"),
        (status = NOT_FOUND, description = "Quiz not found"),
    ),
    tag = "quizzes",
    security(("token" = []))
)]
pub async fn delete_quiz(
    State(service): State<QuizService>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    service.delete_quiz(id, &user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Quiz as presented to a taker, without answer keys.
#[utoipa::path(
    get,
    path = "/api/quizzes/{id}/for-taking",
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = OK, body = QuizForTaking),
        (status = FORBIDDEN, description = "Unpublished or no attempts left"),
        (status = NOT_FOUND, description = "Quiz not found"),
    ),
    tag = "quizzes",
    security(("token" = []))
)]
pub async fn get_quiz_for_taking(
    State(service): State<QuizService>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = service.get_quiz_for_taking(id, &user.id).await?;
    Ok(Json(quiz))
}

/// Aggregated results over all completed attempts.
#[utoipa::path(
    get,
    path = "/api/quizzes/{id}/statistics",
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = OK, body = QuizStatistics),
        (status = FORBIDDEN, description = "Caller is neither creator nor admin"),
        (status = NOT_FOUND, description = "Quiz not found"),
    ),
    tag = "quizzes",
    security(("token" = []))
)]
pub async fn get_statistics(
    State(service): State<QuizService>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let stats = service.quiz_statistics(id, &user).await?;
    Ok(Json(stats))
}
