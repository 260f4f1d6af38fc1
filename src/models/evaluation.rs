// src/models/evaluation.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'evaluations' table: the grading verdict for one
/// response. Auto-graded multiple-choice responses get theirs from the
/// correction pass; free-text responses get theirs from a teacher.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: i64,
    pub response_id: i64,

    /// Points awarded for the response.
    pub note: i64,

    /// Student who authored the graded response.
    pub student_id: i64,

    /// Teacher responsible for the verdict (the exam owner for
    /// auto-graded responses).
    pub teacher_id: i64,

    pub comment: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// An evaluation waiting to be inserted. Produced in memory by the
/// correction pass and persisted in one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvaluation {
    pub response_id: i64,
    pub note: i64,
    pub student_id: i64,
    pub teacher_id: i64,
    pub comment: Option<String>,
}

/// DTO for a teacher manually evaluating a free-text response.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEvaluationRequest {
    pub response_id: i64,
    #[validate(range(min = 0, max = 1000))]
    pub note: i64,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}
