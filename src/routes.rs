// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, docs, health, quiz},
    state::AppState,
    utils::jwt::{auth_middleware, optional_auth_middleware},
};

/// Assembles the main application router.
///
/// * Quiz routes that also serve anonymous callers use optional authentication.
/// * Everything else under `/api/quizzes` requires a bearer token.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let public_quiz_routes = Router::new()
        .route("/course/{course_id}", get(quiz::list_course_quizzes))
        .route("/{id}", get(quiz::get_quiz))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            optional_auth_middleware,
        ));

    let protected_quiz_routes = Router::new()
        .route("/", post(quiz::create_quiz))
        .route("/{id}", put(quiz::update_quiz).delete(quiz::delete_quiz))
        .route("/{id}/for-taking", get(quiz::get_quiz_for_taking))
        .route("/{id}/statistics", get(quiz::get_statistics))
        .route("/{id}/can-take", get(attempt::can_take_quiz))
        .route("/{id}/start", post(attempt::start_attempt))
        .route("/{id}/attempts", get(attempt::list_my_attempts))
        .route("/attempts/{attempt_id}", get(attempt::get_attempt))
        .route("/attempts/{attempt_id}/submit", post(attempt::submit_attempt))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api-docs/openapi.json", get(docs::openapi_json))
        .nest(
            "/api/quizzes",
            public_quiz_routes.merge(protected_quiz_routes),
        )
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
