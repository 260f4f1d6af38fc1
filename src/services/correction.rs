// src/services/correction.rs

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

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

/// Final verdict of one correction pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionOutcome {
    /// 'graded' when every question was auto-gradable, otherwise
    /// 'pending_manual'.
    pub status: GradeStatus,
    /// Total points, set only when fully graded.
    pub score: Option<i64>,
}

/// The grade-record mutation queued by the correction pass. Applied
/// together with the evaluations in a single transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeUpdate {
    pub grade_record_id: i64,
    pub status: GradeStatus,
    /// None leaves the stored score untouched.
    pub score: Option<i64>,
}

/// Persistence operations the correction pass needs. Implemented against
/// Postgres in production and in memory for tests.
#[async_trait]
pub trait CorrectionStore: Send + Sync {
    async fn grade_record(&self, id: i64) -> Result<Option<GradeRecord>, AppError>;

    async fn exam(&self, exam_id: i64) -> Result<Option<Exam>, AppError>;

    async fn questions_by_exam(&self, exam_id: i64) -> Result<Vec<Question>, AppError>;

    async fn answers_by_exam(&self, exam_id: i64) -> Result<Vec<Answer>, AppError>;

    async fn responses_by_user_exam(
        &self,
        user_id: i64,
        exam_id: i64,
    ) -> Result<Vec<UserResponse>, AppError>;

    /// Inserts one empty response per question id and returns the created
    /// rows with their assigned ids.
    async fn insert_empty_responses(
        &self,
        user_id: i64,
        exam_id: i64,
        question_ids: &[i64],
    ) -> Result<Vec<UserResponse>, AppError>;

    /// Batch-loads the (response -> selected answer) links for the given
    /// response ids.
    async fn selected_answers(
        &self,
        response_ids: &[i64],
    ) -> Result<Vec<ResponseAnswer>, AppError>;

    /// Persists the evaluations and the grade-record transition atomically.
    /// Must refuse the update when the record is no longer 'in_progress'.
    async fn apply_grading(
        &self,
        evaluations: &[NewEvaluation],
        update: &GradeUpdate,
    ) -> Result<(), AppError>;
}

/// Points awarded for one multiple-choice question.
///
/// Single-answer questions score full points only for exactly one selected
/// answer that is correct. Multi-answer questions require the selected set
/// to equal the correct set exactly (and be non-empty); no partial credit.
/// Fractional max-points values are truncated to whole points.
fn awarded_points(question: &Question, selected: &HashSet<i64>, correct: &HashSet<i64>) -> i64 {
    let points = question.max_points.trunc() as i64;

    let exact = if question.multi_answer {
        !selected.is_empty() && selected == correct
    } else {
        selected.len() == 1 && selected.iter().all(|id| correct.contains(id))
    };

    if exact { points } else { 0 }
}

/// Runs the auto-grading pass for one finished session.
///
/// Precondition: the grade record exists, matches (user, exam) and is still
/// 'in_progress'; otherwise nothing is mutated and a not-found error is
/// returned. Every unanswered question gets a synthesized empty response so
/// each question has exactly one response to evaluate. Evaluations and the
/// grade transition are persisted in one transaction.
pub async fn correct_exam(
    store: &dyn CorrectionStore,
    user_id: i64,
    exam_id: i64,
    grade_record_id: i64,
) -> Result<CorrectionOutcome, AppError> {
    let record = store
        .grade_record(grade_record_id)
        .await?
        .filter(|r| {
            r.user_id == user_id
                && r.exam_id == exam_id
                && r.status() == Some(GradeStatus::InProgress)
        })
        .ok_or_else(|| {
            AppError::NotFound("grade record not found or already finalized".to_string())
        })?;

    let exam = store
        .exam(exam_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("exam {} not found", exam_id)))?;

    let questions = store.questions_by_exam(exam_id).await?;
    let mut responses = store.responses_by_user_exam(user_id, exam_id).await?;
    let answers = store.answers_by_exam(exam_id).await?;

    // Every question must end up with exactly one response to evaluate.
    let answered: HashSet<i64> = responses.iter().map(|r| r.question_id).collect();
    let unanswered: Vec<i64> = questions
        .iter()
        .map(|q| q.id)
        .filter(|id| !answered.contains(id))
        .collect();
    if !unanswered.is_empty() {
        tracing::debug!(
            "synthesizing {} empty responses for user {} exam {}",
            unanswered.len(),
            user_id,
            exam_id
        );
        let synthesized = store
            .insert_empty_responses(user_id, exam_id, &unanswered)
            .await?;
        responses.extend(synthesized);
    }

    let response_by_question: HashMap<i64, &UserResponse> =
        responses.iter().map(|r| (r.question_id, r)).collect();

    let response_ids: Vec<i64> = responses.iter().map(|r| r.id).collect();
    let mut selected_by_response: HashMap<i64, HashSet<i64>> = HashMap::new();
    for link in store.selected_answers(&response_ids).await? {
        selected_by_response
            .entry(link.response_id)
            .or_default()
            .insert(link.answer_id);
    }

    let mut correct_by_question: HashMap<i64, HashSet<i64>> = HashMap::new();
    for answer in &answers {
        if answer.correct {
            correct_by_question
                .entry(answer.question_id)
                .or_default()
                .insert(answer.id);
        }
    }

    let empty = HashSet::new();
    let mut evaluations = Vec::new();
    let mut total: i64 = 0;
    let mut fully_automatic = true;

    for question in &questions {
        if !question.multiple_choice {
            // Free-text question: left for a teacher to evaluate.
            fully_automatic = false;
            continue;
        }

        let Some(response) = response_by_question.get(&question.id) else {
            continue;
        };
        let selected = selected_by_response.get(&response.id).unwrap_or(&empty);
        let correct = correct_by_question.get(&question.id).unwrap_or(&empty);

        let points = awarded_points(question, selected, correct);
        total += points;

        evaluations.push(NewEvaluation {
            response_id: response.id,
            note: points,
            student_id: user_id,
            teacher_id: exam.owner_id,
            comment: None,
        });
    }

    let update = if fully_automatic {
        GradeUpdate {
            grade_record_id: record.id,
            status: GradeStatus::Graded,
            score: Some(total),
        }
    } else {
        GradeUpdate {
            grade_record_id: record.id,
            status: GradeStatus::PendingManual,
            score: None,
        }
    };

    store.apply_grading(&evaluations, &update).await?;

    Ok(CorrectionOutcome {
        status: update.status,
        score: update.score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(multi_answer: bool, max_points: f64) -> Question {
        Question {
            id: 1,
            exam_id: 1,
            content: "q".to_string(),
            multiple_choice: true,
            multi_answer,
            max_points,
            position: 0,
            created_at: None,
        }
    }

    fn set(ids: &[i64]) -> HashSet<i64> {
        ids.iter().copied().collect()
    }

    #[test]
    fn single_answer_correct_selection_scores_max() {
        let q = question(false, 10.0);
        assert_eq!(awarded_points(&q, &set(&[1]), &set(&[1])), 10);
    }

    #[test]
    fn single_answer_empty_selection_scores_zero() {
        let q = question(false, 10.0);
        assert_eq!(awarded_points(&q, &set(&[]), &set(&[1])), 0);
    }

    #[test]
    fn single_answer_two_selections_score_zero() {
        let q = question(false, 10.0);
        assert_eq!(awarded_points(&q, &set(&[1, 2]), &set(&[1])), 0);
    }

    #[test]
    fn multi_answer_exact_match_scores_max() {
        let q = question(true, 5.0);
        assert_eq!(awarded_points(&q, &set(&[1, 2]), &set(&[1, 2])), 5);
    }

    #[test]
    fn multi_answer_missing_correct_scores_zero() {
        let q = question(true, 5.0);
        assert_eq!(awarded_points(&q, &set(&[1]), &set(&[1, 2])), 0);
    }

    #[test]
    fn multi_answer_extra_incorrect_scores_zero() {
        let q = question(true, 5.0);
        assert_eq!(awarded_points(&q, &set(&[1, 2, 3]), &set(&[1, 2])), 0);
    }

    #[test]
    fn multi_answer_empty_selection_scores_zero() {
        // A question with no correct answers must not reward an empty set.
        let q = question(true, 5.0);
        assert_eq!(awarded_points(&q, &set(&[]), &set(&[])), 0);
    }

    #[test]
    fn fractional_max_points_truncate() {
        let q = question(false, 7.9);
        assert_eq!(awarded_points(&q, &set(&[1]), &set(&[1])), 7);
    }
}
