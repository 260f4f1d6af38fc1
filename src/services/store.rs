// src/services/store.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres};

use crate::{
    error::AppError,
    models::{
        answer::Answer,
        evaluation::NewEvaluation,
        exam::Exam,
        grade::{GradeRecord, GradeStatus},
        question::Question,
        response::{ResponseAnswer, UserResponse},
    },
};

use super::correction::{CorrectionStore, GradeUpdate};

/// Postgres-backed implementation of the correction persistence contract.
pub struct PgCorrectionStore {
    pool: PgPool,
}

impl PgCorrectionStore {
    pub fn new(pool: PgPool) -> Self {
        PgCorrectionStore { pool }
    }
}

#[async_trait]
impl CorrectionStore for PgCorrectionStore {
    async fn grade_record(&self, id: i64) -> Result<Option<GradeRecord>, AppError> {
        let record = sqlx::query_as::<_, GradeRecord>(
            "SELECT id, user_id, exam_id, class_id, status, score, created_at
             FROM grade_records WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn exam(&self, exam_id: i64) -> Result<Option<Exam>, AppError> {
        let exam = sqlx::query_as::<_, Exam>(
            "SELECT id, class_id, owner_id, title, duration_seconds, created_at
             FROM exams WHERE id = $1",
        )
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(exam)
    }

    async fn questions_by_exam(&self, exam_id: i64) -> Result<Vec<Question>, AppError> {
        let questions = sqlx::query_as::<_, Question>(
            "SELECT id, exam_id, content, multiple_choice, multi_answer, max_points, position, created_at
             FROM questions WHERE exam_id = $1 ORDER BY position, id",
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }

    async fn answers_by_exam(&self, exam_id: i64) -> Result<Vec<Answer>, AppError> {
        let answers = sqlx::query_as::<_, Answer>(
            "SELECT id, question_id, exam_id, content, correct
             FROM answers WHERE exam_id = $1",
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(answers)
    }

    async fn responses_by_user_exam(
        &self,
        user_id: i64,
        exam_id: i64,
    ) -> Result<Vec<UserResponse>, AppError> {
        let responses = sqlx::query_as::<_, UserResponse>(
            "SELECT id, user_id, question_id, exam_id, content, created_at
             FROM user_responses WHERE user_id = $1 AND exam_id = $2",
        )
        .bind(user_id)
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(responses)
    }

    async fn insert_empty_responses(
        &self,
        user_id: i64,
        exam_id: i64,
        question_ids: &[i64],
    ) -> Result<Vec<UserResponse>, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut created = Vec::with_capacity(question_ids.len());
        for question_id in question_ids {
            let response = sqlx::query_as::<_, UserResponse>(
                "INSERT INTO user_responses (user_id, question_id, exam_id, content)
                 VALUES ($1, $2, $3, NULL)
                 RETURNING id, user_id, question_id, exam_id, content, created_at",
            )
            .bind(user_id)
            .bind(question_id)
            .bind(exam_id)
            .fetch_one(&mut *tx)
            .await?;
            created.push(response);
        }

        tx.commit().await?;

        Ok(created)
    }

    async fn selected_answers(
        &self,
        response_ids: &[i64],
    ) -> Result<Vec<ResponseAnswer>, AppError> {
        if response_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Dynamic IN clause, same as the answer-key lookups elsewhere.
        let mut query_builder = sqlx::QueryBuilder::<Postgres>::new(
            "SELECT response_id, answer_id FROM response_answers WHERE response_id IN (",
        );

        let mut separated = query_builder.separated(",");
        for id in response_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let links: Vec<ResponseAnswer> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        Ok(links)
    }

    async fn apply_grading(
        &self,
        evaluations: &[NewEvaluation],
        update: &GradeUpdate,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for eval in evaluations {
            sqlx::query(
                "INSERT INTO evaluations (response_id, note, student_id, teacher_id, comment)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(eval.response_id)
            .bind(eval.note)
            .bind(eval.student_id)
            .bind(eval.teacher_id)
            .bind(&eval.comment)
            .execute(&mut *tx)
            .await?;
        }

        // The status guard makes the in_progress record the single writer:
        // a concurrent correction against the same record loses here and the
        // whole transaction rolls back, evaluations included.
        let result = match update.score {
            Some(score) => {
                sqlx::query(
                    "UPDATE grade_records SET status = $1, score = $2
                     WHERE id = $3 AND status = $4",
                )
                .bind(update.status.as_str())
                .bind(score)
                .bind(update.grade_record_id)
                .bind(GradeStatus::InProgress.as_str())
                .execute(&mut *tx)
                .await?
            }
            None => {
                sqlx::query(
                    "UPDATE grade_records SET status = $1
                     WHERE id = $2 AND status = $3",
                )
                .bind(update.status.as_str())
                .bind(update.grade_record_id)
                .bind(GradeStatus::InProgress.as_str())
                .execute(&mut *tx)
                .await?
            }
        };

        if result.rows_affected() != 1 {
            return Err(AppError::Conflict(
                "grade record not found or already finalized".to_string(),
            ));
        }

        tx.commit().await?;

        Ok(())
    }
}
