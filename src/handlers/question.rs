// src/handlers/question.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{CreateQuestionRequest, PublicQuestion, Question, UpdateQuestionRequest},
    utils::jwt::Claims,
};

use super::exam::{ensure_owner, fetch_exam};

/// Creates a new question on an exam owned by the caller.
pub async fn create_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let exam = fetch_exam(&pool, payload.exam_id).await?;
    ensure_owner(&claims, &exam)?;

    let question = sqlx::query_as::<_, Question>(
        r#"
        INSERT INTO questions (exam_id, content, multiple_choice, multi_answer, max_points, position)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, exam_id, content, multiple_choice, multi_answer, max_points, position, created_at
        "#,
    )
    .bind(payload.exam_id)
    .bind(&payload.content)
    .bind(payload.multiple_choice)
    .bind(payload.multi_answer)
    .bind(payload.max_points)
    .bind(payload.position)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Lists the questions of an exam.
///
/// Teachers get the full rows; students get the public DTO (same fields
/// today, but correctness data stays attached to answers, which have their
/// own public shape).
pub async fn list_exam_questions(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let questions = sqlx::query_as::<_, Question>(
        "SELECT id, exam_id, content, multiple_choice, multi_answer, max_points, position, created_at
         FROM questions WHERE exam_id = $1 ORDER BY position, id",
    )
    .bind(exam_id)
    .fetch_all(&pool)
    .await?;

    if claims.role == "student" {
        let public: Vec<PublicQuestion> = questions.into_iter().map(PublicQuestion::from).collect();
        return Ok(Json(public).into_response());
    }

    Ok(Json(questions).into_response())
}

/// Updates a question. Only the owning teacher (or an admin) may change it.
pub async fn update_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let question = fetch_question(&pool, id).await?;
    let exam = fetch_exam(&pool, question.exam_id).await?;
    ensure_owner(&claims, &exam)?;

    let question = sqlx::query_as::<_, Question>(
        r#"
        UPDATE questions SET
            content = COALESCE($1, content),
            multiple_choice = COALESCE($2, multiple_choice),
            multi_answer = COALESCE($3, multi_answer),
            max_points = COALESCE($4, max_points),
            position = COALESCE($5, position)
        WHERE id = $6
        RETURNING id, exam_id, content, multiple_choice, multi_answer, max_points, position, created_at
        "#,
    )
    .bind(&payload.content)
    .bind(payload.multiple_choice)
    .bind(payload.multi_answer)
    .bind(payload.max_points)
    .bind(payload.position)
    .bind(id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(question))
}

/// Deletes a question. Only the owning teacher (or an admin) may delete it.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = fetch_question(&pool, id).await?;
    let exam = fetch_exam(&pool, question.exam_id).await?;
    ensure_owner(&claims, &exam)?;

    sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn fetch_question(pool: &PgPool, id: i64) -> Result<Question, AppError> {
    sqlx::query_as::<_, Question>(
        "SELECT id, exam_id, content, multiple_choice, multi_answer, max_points, position, created_at
         FROM questions WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Question {} not found", id)))
}
