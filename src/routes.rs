// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{answer, auth, class, exam, grade, question, response, session, user},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, teacher_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, users, classes, exams, ...).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, session manager, notifier).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_mw = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let user_routes = Router::new()
        .route("/{id}", get(user::get_user))
        .route("/{id}/grades/average", get(grade::user_average))
        // Admin-only user management
        .merge(
            Router::new()
                .route("/", get(user::list_users))
                .route("/{id}", put(user::update_user).delete(user::delete_user))
                .layer(middleware::from_fn(admin_middleware)),
        )
        .layer(auth_mw.clone());

    let class_routes = Router::new()
        .route("/", get(class::list_classes))
        .route("/{id}", get(class::get_class))
        .route("/{id}/members", get(class::list_members))
        .merge(
            Router::new()
                .route("/", post(class::create_class))
                .route("/{id}", put(class::update_class).delete(class::delete_class))
                .route("/{id}/members", post(class::enroll_member))
                .route("/{id}/members/{user_id}", delete(class::unenroll_member))
                .layer(middleware::from_fn(teacher_middleware)),
        )
        .layer(auth_mw.clone());

    let exam_routes = Router::new()
        .route("/", get(exam::list_exams))
        .route("/{id}", get(exam::get_exam))
        .route("/{id}/questions", get(question::list_exam_questions))
        // Session lifecycle (the timed-exam core)
        .route(
            "/{id}/session",
            post(session::start_session).get(session::remaining_time),
        )
        .route("/{id}/session/stop", post(session::stop_session))
        .route("/{id}/session/events", get(session::session_events))
        .merge(
            Router::new()
                .route("/", post(exam::create_exam))
                .route("/{id}", put(exam::update_exam).delete(exam::delete_exam))
                .route("/{id}/grades", get(grade::exam_grades))
                .route("/{id}/grades/average", get(grade::exam_average))
                .layer(middleware::from_fn(teacher_middleware)),
        )
        .layer(auth_mw.clone());

    let question_routes = Router::new()
        .route("/{id}/answers", get(answer::list_question_answers))
        .merge(
            Router::new()
                .route("/", post(question::create_question))
                .route(
                    "/{id}",
                    put(question::update_question).delete(question::delete_question),
                )
                .layer(middleware::from_fn(teacher_middleware)),
        )
        .layer(auth_mw.clone());

    let answer_routes = Router::new()
        .route("/", post(answer::create_answer))
        .route(
            "/{id}",
            put(answer::update_answer).delete(answer::delete_answer),
        )
        .layer(middleware::from_fn(teacher_middleware))
        .layer(auth_mw.clone());

    let response_routes = Router::new()
        .route("/", put(response::submit_response))
        .layer(auth_mw.clone());

    let grade_routes = Router::new()
        .route("/mine", get(grade::my_grades))
        .merge(
            Router::new()
                .route("/{id}/finalize", post(grade::finalize_manual))
                .layer(middleware::from_fn(teacher_middleware)),
        )
        .layer(auth_mw.clone());

    let evaluation_routes = Router::new()
        .route("/", post(grade::create_evaluation))
        .layer(middleware::from_fn(teacher_middleware))
        .layer(auth_mw);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/classes", class_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/answers", answer_routes)
        .nest("/api/responses", response_routes)
        .nest("/api/grades", grade_routes)
        .nest("/api/evaluations", evaluation_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
