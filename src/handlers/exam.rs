// src/handlers/exam.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::exam::{CreateExamRequest, Exam, UpdateExamRequest},
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
pub struct ExamFilter {
    pub class_id: Option<i64>,
}

/// Creates a new exam owned by the calling teacher.
pub async fn create_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let exam = sqlx::query_as::<_, Exam>(
        r#"
        INSERT INTO exams (class_id, owner_id, title, duration_seconds)
        VALUES ($1, $2, $3, $4)
        RETURNING id, class_id, owner_id, title, duration_seconds, created_at
        "#,
    )
    .bind(payload.class_id)
    .bind(claims.user_id())
    .bind(&payload.title)
    .bind(payload.duration_seconds)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("foreign key") {
            AppError::NotFound(format!("Class {} not found", payload.class_id))
        } else {
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(exam)))
}

/// Lists exams, optionally filtered by class.
pub async fn list_exams(
    State(pool): State<PgPool>,
    Query(filter): Query<ExamFilter>,
) -> Result<impl IntoResponse, AppError> {
    let exams = match filter.class_id {
        Some(class_id) => {
            sqlx::query_as::<_, Exam>(
                "SELECT id, class_id, owner_id, title, duration_seconds, created_at
                 FROM exams WHERE class_id = $1 ORDER BY id",
            )
            .bind(class_id)
            .fetch_all(&pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Exam>(
                "SELECT id, class_id, owner_id, title, duration_seconds, created_at
                 FROM exams ORDER BY id",
            )
            .fetch_all(&pool)
            .await?
        }
    };

    Ok(Json(exams))
}

/// Fetches a single exam by id.
pub async fn get_exam(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = fetch_exam(&pool, id).await?;
    Ok(Json(exam))
}

/// Updates an exam. Only the owner (or an admin) may change it.
pub async fn update_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let exam = fetch_exam(&pool, id).await?;
    ensure_owner(&claims, &exam)?;

    let exam = sqlx::query_as::<_, Exam>(
        r#"
        UPDATE exams SET
            title = COALESCE($1, title),
            duration_seconds = COALESCE($2, duration_seconds)
        WHERE id = $3
        RETURNING id, class_id, owner_id, title, duration_seconds, created_at
        "#,
    )
    .bind(&payload.title)
    .bind(payload.duration_seconds)
    .bind(id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(exam))
}

/// Deletes an exam. Only the owner (or an admin) may delete it.
pub async fn delete_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = fetch_exam(&pool, id).await?;
    ensure_owner(&claims, &exam)?;

    sqlx::query("DELETE FROM exams WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn fetch_exam(pool: &PgPool, id: i64) -> Result<Exam, AppError> {
    sqlx::query_as::<_, Exam>(
        "SELECT id, class_id, owner_id, title, duration_seconds, created_at
         FROM exams WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Exam {} not found", id)))
}

pub(crate) fn ensure_owner(claims: &Claims, exam: &Exam) -> Result<(), AppError> {
    if claims.role != "admin" && exam.owner_id != claims.user_id() {
        return Err(AppError::Forbidden(
            "Only the exam owner may modify it".to_string(),
        ));
    }
    Ok(())
}
