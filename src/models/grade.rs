// src/models/grade.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status of a grade record, stored as text in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeStatus {
    /// An exam session is running for this record.
    InProgress,
    /// The session ended but at least one question needs manual grading.
    PendingManual,
    /// Fully graded; `score` is set.
    Graded,
}

impl GradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeStatus::InProgress => "in_progress",
            GradeStatus::PendingManual => "pending_manual",
            GradeStatus::Graded => "graded",
        }
    }

    pub fn parse(s: &str) -> Option<GradeStatus> {
        match s {
            "in_progress" => Some(GradeStatus::InProgress),
            "pending_manual" => Some(GradeStatus::PendingManual),
            "graded" => Some(GradeStatus::Graded),
            _ => None,
        }
    }
}

/// Represents the 'grade_records' table: one user's standing for one exam
/// within one class. Created with status 'in_progress' when the session
/// starts; moved to 'graded' or 'pending_manual' exactly once by the
/// correction pass.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GradeRecord {
    pub id: i64,
    pub user_id: i64,
    pub exam_id: i64,
    pub class_id: i64,

    /// One of 'in_progress', 'pending_manual', 'graded'.
    pub status: String,

    /// Total points. Null until the record reaches 'graded'.
    pub score: Option<i64>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl GradeRecord {
    pub fn status(&self) -> Option<GradeStatus> {
        GradeStatus::parse(&self.status)
    }
}

/// A grade record joined with the student's username, for teacher views.
#[derive(Debug, Serialize, FromRow)]
pub struct GradeEntry {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub status: String,
    pub score: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Aggregated grade-average row. Averages only cover 'graded' records.
#[derive(Debug, Serialize, FromRow)]
pub struct GradeAverage {
    pub graded_count: i64,
    pub average_score: Option<f64>,
}
