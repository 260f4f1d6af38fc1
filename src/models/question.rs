// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub exam_id: i64,

    /// The text content of the question.
    pub content: String,

    /// Whether the question is multiple-choice. Only multiple-choice
    /// questions can be auto-graded; everything else awaits a teacher.
    pub multiple_choice: bool,

    /// For multiple-choice questions: whether more than one answer may be
    /// correct. Single-answer questions expect exactly one selection.
    pub multi_answer: bool,

    /// Maximum points awarded for a fully correct response.
    pub max_points: f64,

    /// Display order within the exam.
    pub position: i32,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for sending a question to students (excludes nothing sensitive
/// itself, but is the shape answers are attached to without their
/// correctness flags).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub exam_id: i64,
    pub content: String,
    pub multiple_choice: bool,
    pub multi_answer: bool,
    pub max_points: f64,
    pub position: i32,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        PublicQuestion {
            id: q.id,
            exam_id: q.exam_id,
            content: q.content,
            multiple_choice: q.multiple_choice,
            multi_answer: q.multi_answer,
            max_points: q.max_points,
            position: q.position,
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    pub exam_id: i64,
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
    pub multiple_choice: bool,
    #[serde(default)]
    pub multi_answer: bool,
    #[validate(range(min = 0.0, max = 100.0))]
    pub max_points: f64,
    #[serde(default)]
    pub position: i32,
}

/// DTO for updating a question. Absent fields keep their current value.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub content: Option<String>,
    pub multiple_choice: Option<bool>,
    pub multi_answer: Option<bool>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub max_points: Option<f64>,
    pub position: Option<i32>,
}
