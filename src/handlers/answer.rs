// src/handlers/answer.rs

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
    models::answer::{Answer, CreateAnswerRequest, PublicAnswer, UpdateAnswerRequest},
    utils::jwt::Claims,
};

use super::{
    exam::{ensure_owner, fetch_exam},
    question::fetch_question,
};

/// Creates a new answer option on a question of an exam owned by the caller.
pub async fn create_answer(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let question = fetch_question(&pool, payload.question_id).await?;
    let exam = fetch_exam(&pool, question.exam_id).await?;
    ensure_owner(&claims, &exam)?;

    let answer = sqlx::query_as::<_, Answer>(
        r#"
        INSERT INTO answers (question_id, exam_id, content, correct)
        VALUES ($1, $2, $3, $4)
        RETURNING id, question_id, exam_id, content, correct
        "#,
    )
    .bind(payload.question_id)
    .bind(question.exam_id)
    .bind(&payload.content)
    .bind(payload.correct)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(answer)))
}

/// Lists the answer options of a question. Students get the public DTO
/// with the correctness flag stripped.
pub async fn list_question_answers(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if claims.role == "student" {
        let answers = sqlx::query_as::<_, PublicAnswer>(
            "SELECT id, question_id, content FROM answers WHERE question_id = $1 ORDER BY id",
        )
        .bind(question_id)
        .fetch_all(&pool)
        .await?;
        return Ok(Json(answers).into_response());
    }

    let answers = sqlx::query_as::<_, Answer>(
        "SELECT id, question_id, exam_id, content, correct
         FROM answers WHERE question_id = $1 ORDER BY id",
    )
    .bind(question_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(answers).into_response())
}

/// Updates an answer option.
pub async fn update_answer(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let answer = fetch_answer(&pool, id).await?;
    let exam = fetch_exam(&pool, answer.exam_id).await?;
    ensure_owner(&claims, &exam)?;

    let answer = sqlx::query_as::<_, Answer>(
        r#"
        UPDATE answers SET
            content = COALESCE($1, content),
            correct = COALESCE($2, correct)
        WHERE id = $3
        RETURNING id, question_id, exam_id, content, correct
        "#,
    )
    .bind(&payload.content)
    .bind(payload.correct)
    .bind(id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(answer))
}

/// Deletes an answer option.
pub async fn delete_answer(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let answer = fetch_answer(&pool, id).await?;
    let exam = fetch_exam(&pool, answer.exam_id).await?;
    ensure_owner(&claims, &exam)?;

    sqlx::query("DELETE FROM answers WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_answer(pool: &PgPool, id: i64) -> Result<Answer, AppError> {
    sqlx::query_as::<_, Answer>(
        "SELECT id, question_id, exam_id, content, correct FROM answers WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Answer {} not found", id)))
}
