// src/handlers/response.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::response::{SubmitResponseRequest, UserResponse},
    state::AppState,
    utils::jwt::Claims,
};

/// Submits (or replaces) the caller's response to one question.
///
/// Only accepted while the caller has a running session for the exam.
/// Response row and selected-answer links are replaced in one transaction,
/// so a re-submission never leaves stale selections behind.
pub async fn submit_response(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitResponseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id();

    if state
        .sessions
        .active_session(user_id, payload.exam_id)
        .is_none()
    {
        return Err(AppError::BadRequest(
            "No running session for this exam".to_string(),
        ));
    }

    let pool: &PgPool = &state.pool;
    let mut tx = pool.begin().await?;

    // Replace any earlier response to the same question.
    sqlx::query(
        "DELETE FROM user_responses WHERE user_id = $1 AND question_id = $2 AND exam_id = $3",
    )
    .bind(user_id)
    .bind(payload.question_id)
    .bind(payload.exam_id)
    .execute(&mut *tx)
    .await?;

    let response = sqlx::query_as::<_, UserResponse>(
        r#"
        INSERT INTO user_responses (user_id, question_id, exam_id, content)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, question_id, exam_id, content, created_at
        "#,
    )
    .bind(user_id)
    .bind(payload.question_id)
    .bind(payload.exam_id)
    .bind(&payload.content)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if e.to_string().contains("foreign key") {
            AppError::NotFound("Question or exam not found".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    for answer_id in &payload.selected_answer_ids {
        sqlx::query("INSERT INTO response_answers (response_id, answer_id) VALUES ($1, $2)")
            .bind(response.id)
            .bind(answer_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if e.to_string().contains("foreign key") {
                    AppError::NotFound(format!("Answer {} not found", answer_id))
                } else {
                    AppError::from(e)
                }
            })?;
    }

    tx.commit().await?;

    Ok(Json(response))
}
