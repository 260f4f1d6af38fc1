// src/handlers/grade.rs

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
    models::{
        evaluation::{CreateEvaluationRequest, Evaluation},
        grade::{GradeAverage, GradeEntry, GradeRecord, GradeStatus},
    },
    utils::jwt::Claims,
};

/// Lists the caller's own grade records.
pub async fn my_grades(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let grades = sqlx::query_as::<_, GradeRecord>(
        "SELECT id, user_id, exam_id, class_id, status, score, created_at
         FROM grade_records WHERE user_id = $1 ORDER BY id DESC",
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(grades))
}

/// Lists every grade record of an exam, joined with usernames (teacher only).
pub async fn exam_grades(
    State(pool): State<PgPool>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let grades = sqlx::query_as::<_, GradeEntry>(
        r#"
        SELECT g.id, g.user_id, u.username, g.status, g.score, g.created_at
        FROM grade_records g
        JOIN users u ON u.id = g.user_id
        WHERE g.exam_id = $1
        ORDER BY u.username
        "#,
    )
    .bind(exam_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(grades))
}

/// Average score of an exam across graded records (teacher only).
pub async fn exam_average(
    State(pool): State<PgPool>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let average = sqlx::query_as::<_, GradeAverage>(
        r#"
        SELECT COUNT(*) AS graded_count, AVG(score)::FLOAT8 AS average_score
        FROM grade_records
        WHERE exam_id = $1 AND status = 'graded'
        "#,
    )
    .bind(exam_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(average))
}

/// Average score of one user across all their graded records.
pub async fn user_average(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    // Students may only look at their own average.
    if claims.role == "student" && claims.user_id() != user_id {
        return Err(AppError::Forbidden(
            "Cannot read another student's grades".to_string(),
        ));
    }

    let average = sqlx::query_as::<_, GradeAverage>(
        r#"
        SELECT COUNT(*) AS graded_count, AVG(score)::FLOAT8 AS average_score
        FROM grade_records
        WHERE user_id = $1 AND status = 'graded'
        "#,
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(average))
}

/// Records a teacher's manual evaluation of a free-text response.
pub async fn create_evaluation(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateEvaluationRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let student_id: Option<i64> =
        sqlx::query_scalar("SELECT user_id FROM user_responses WHERE id = $1")
            .bind(payload.response_id)
            .fetch_optional(&pool)
            .await?;

    let student_id = student_id.ok_or_else(|| {
        AppError::NotFound(format!("Response {} not found", payload.response_id))
    })?;

    let evaluation = sqlx::query_as::<_, Evaluation>(
        r#"
        INSERT INTO evaluations (response_id, note, student_id, teacher_id, comment)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, response_id, note, student_id, teacher_id, comment, created_at
        "#,
    )
    .bind(payload.response_id)
    .bind(payload.note)
    .bind(student_id)
    .bind(claims.user_id())
    .bind(&payload.comment)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict("Response already evaluated".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(evaluation)))
}

/// Moves a 'pending_manual' grade record to 'graded' once every response
/// has an evaluation. Score = sum of evaluation notes.
pub async fn finalize_manual(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let record = sqlx::query_as::<_, GradeRecord>(
        "SELECT id, user_id, exam_id, class_id, status, score, created_at
         FROM grade_records WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Grade record {} not found", id)))?;

    if record.status() != Some(GradeStatus::PendingManual) {
        return Err(AppError::Conflict(
            "Grade record is not awaiting manual grading".to_string(),
        ));
    }

    let (question_count, evaluated_count, total): (i64, i64, Option<i64>) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM questions WHERE exam_id = $1),
            COUNT(e.id),
            SUM(e.note)
        FROM user_responses r
        JOIN evaluations e ON e.response_id = r.id
        WHERE r.user_id = $2 AND r.exam_id = $1
        "#,
    )
    .bind(record.exam_id)
    .bind(record.user_id)
    .fetch_one(&pool)
    .await?;

    if evaluated_count < question_count {
        return Err(AppError::BadRequest(format!(
            "{} of {} responses still await evaluation",
            question_count - evaluated_count,
            question_count
        )));
    }

    let score = total.unwrap_or(0);

    let result = sqlx::query(
        "UPDATE grade_records SET status = $1, score = $2 WHERE id = $3 AND status = $4",
    )
    .bind(GradeStatus::Graded.as_str())
    .bind(score)
    .bind(id)
    .bind(GradeStatus::PendingManual.as_str())
    .execute(&pool)
    .await?;

    if result.rows_affected() != 1 {
        return Err(AppError::Conflict(
            "Grade record was finalized concurrently".to_string(),
        ));
    }

    Ok(Json(serde_json::json!({
        "id": id,
        "status": GradeStatus::Graded,
        "score": score
    })))
}
