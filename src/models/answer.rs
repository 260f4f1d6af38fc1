// src/models/answer.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'answers' table: one selectable option of a
/// multiple-choice question.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub question_id: i64,
    pub exam_id: i64,
    pub content: String,

    /// Whether selecting this answer is (part of) the correct solution.
    pub correct: bool,
}

/// DTO for sending an answer option to students (hides the correct flag).
#[derive(Debug, Serialize, FromRow)]
pub struct PublicAnswer {
    pub id: i64,
    pub question_id: i64,
    pub content: String,
}

/// DTO for creating a new answer option.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAnswerRequest {
    pub question_id: i64,
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    #[serde(default)]
    pub correct: bool,
}

/// DTO for updating an answer option.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAnswerRequest {
    #[validate(length(min = 1, max = 1000))]
    pub content: Option<String>,
    pub correct: Option<bool>,
}
