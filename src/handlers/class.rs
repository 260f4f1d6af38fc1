// src/handlers/class.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::class::{Class, ClassMember, ClassRequest, EnrollRequest},
};

/// Creates a new class (teacher only).
pub async fn create_class(
    State(pool): State<PgPool>,
    Json(payload): Json<ClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let class = sqlx::query_as::<_, Class>(
        "INSERT INTO classes (name) VALUES ($1) RETURNING id, name, created_at",
    )
    .bind(&payload.name)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(class)))
}

/// Lists all classes.
pub async fn list_classes(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let classes =
        sqlx::query_as::<_, Class>("SELECT id, name, created_at FROM classes ORDER BY id")
            .fetch_all(&pool)
            .await?;

    Ok(Json(classes))
}

/// Fetches a single class by id.
pub async fn get_class(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let class = sqlx::query_as::<_, Class>("SELECT id, name, created_at FROM classes WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Class {} not found", id)))?;

    Ok(Json(class))
}

/// Renames a class (teacher only).
pub async fn update_class(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<ClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let class = sqlx::query_as::<_, Class>(
        "UPDATE classes SET name = $1 WHERE id = $2 RETURNING id, name, created_at",
    )
    .bind(&payload.name)
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Class {} not found", id)))?;

    Ok(Json(class))
}

/// Deletes a class (teacher only).
pub async fn delete_class(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM classes WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Class {} not found", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Lists the members of a class, joined with user data.
pub async fn list_members(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let members = sqlx::query_as::<_, ClassMember>(
        r#"
        SELECT u.id AS user_id, u.username, u.role
        FROM class_members cm
        JOIN users u ON u.id = cm.user_id
        WHERE cm.class_id = $1
        ORDER BY u.username
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(members))
}

/// Enrolls a user into a class (teacher only).
pub async fn enroll_member(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<EnrollRequest>,
) -> Result<impl IntoResponse, AppError> {
    sqlx::query("INSERT INTO class_members (class_id, user_id) VALUES ($1, $2)")
        .bind(id)
        .bind(payload.user_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
                AppError::Conflict("User already enrolled".to_string())
            } else if e.to_string().contains("foreign key") {
                AppError::NotFound("Class or user not found".to_string())
            } else {
                AppError::from(e)
            }
        })?;

    Ok(StatusCode::CREATED)
}

/// Removes a user from a class (teacher only).
pub async fn unenroll_member(
    State(pool): State<PgPool>,
    Path((id, user_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM class_members WHERE class_id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Enrollment not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
