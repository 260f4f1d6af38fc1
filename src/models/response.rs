// src/models/response.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'user_responses' table: one student's response to one
/// question. Created by the student while the exam runs, or synthesized
/// empty by the correction pass for questions left unanswered.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,
    pub exam_id: i64,

    /// Free-text content for open questions. None for pure multiple-choice
    /// responses and for synthesized empty responses.
    pub content: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A row of the 'response_answers' join table: one selected answer of one
/// response.
#[derive(Debug, Clone, Copy, FromRow, Serialize)]
pub struct ResponseAnswer {
    pub response_id: i64,
    pub answer_id: i64,
}

/// DTO for submitting (or replacing) a response during an exam.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitResponseRequest {
    pub exam_id: i64,
    pub question_id: i64,
    #[validate(length(max = 10000))]
    pub content: Option<String>,
    /// Selected answer ids for multiple-choice questions.
    #[serde(default)]
    pub selected_answer_ids: Vec<i64>,
}
