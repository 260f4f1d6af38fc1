// src/models/exam.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,

    /// Class the exam is assigned to.
    pub class_id: i64,

    /// Teacher who owns the exam. Used as the grading teacher for
    /// auto-generated evaluations.
    pub owner_id: i64,

    pub title: String,

    /// Allotted time for one attempt, in seconds. Always positive.
    pub duration_seconds: i64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new exam.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    pub class_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 1, max = 86400))]
    pub duration_seconds: i64,
}

/// DTO for updating an exam. Absent fields keep their current value.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(range(min = 1, max = 86400))]
    pub duration_seconds: Option<i64>,
}
