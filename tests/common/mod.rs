// tests/common/mod.rs
#![allow(dead_code)] // each test binary uses a different subset
//
// In-memory test doubles for the correction store and the notification
// sink, so session and correction behavior can be exercised without a
// database or a live event channel.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use examtrack::error::AppError;
use examtrack::models::{
    answer::Answer,
    evaluation::NewEvaluation,
    exam::Exam,
    grade::{GradeRecord, GradeStatus},
    question::Question,
    response::{ResponseAnswer, UserResponse},
};
use examtrack::services::correction::{CorrectionStore, GradeUpdate};
use examtrack::services::notify::NotificationSink;

#[derive(Default)]
pub struct StoreData {
    pub grade_records: HashMap<i64, GradeRecord>,
    pub exams: HashMap<i64, Exam>,
    pub questions: Vec<Question>,
    pub answers: Vec<Answer>,
    pub responses: Vec<UserResponse>,
    pub links: Vec<ResponseAnswer>,
    pub evaluations: Vec<NewEvaluation>,
    next_id: i64,
}

impl StoreData {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// CorrectionStore backed by plain maps and vectors.
#[derive(Default)]
pub struct InMemoryStore {
    pub data: Mutex<StoreData>,
    /// When set, apply_grading fails with an internal error, simulating a
    /// persistence outage at the final step.
    pub fail_grading: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_exam(&self, id: i64, owner_id: i64, duration_seconds: i64) {
        let mut data = self.data.lock().unwrap();
        data.exams.insert(
            id,
            Exam {
                id,
                class_id: 1,
                owner_id,
                title: format!("exam {}", id),
                duration_seconds,
                created_at: None,
            },
        );
    }

    pub fn add_question(
        &self,
        exam_id: i64,
        multiple_choice: bool,
        multi_answer: bool,
        max_points: f64,
    ) -> i64 {
        let mut data = self.data.lock().unwrap();
        let id = data.next_id();
        data.questions.push(Question {
            id,
            exam_id,
            content: format!("question {}", id),
            multiple_choice,
            multi_answer,
            max_points,
            position: 0,
            created_at: None,
        });
        id
    }

    pub fn add_answer(&self, exam_id: i64, question_id: i64, correct: bool) -> i64 {
        let mut data = self.data.lock().unwrap();
        let id = data.next_id();
        data.answers.push(Answer {
            id,
            question_id,
            exam_id,
            content: format!("answer {}", id),
            correct,
        });
        id
    }

    /// Records a submitted response with the given answer selection.
    pub fn add_response(
        &self,
        user_id: i64,
        exam_id: i64,
        question_id: i64,
        selected: &[i64],
    ) -> i64 {
        let mut data = self.data.lock().unwrap();
        let id = data.next_id();
        data.responses.push(UserResponse {
            id,
            user_id,
            question_id,
            exam_id,
            content: None,
            created_at: None,
        });
        for answer_id in selected {
            data.links.push(ResponseAnswer {
                response_id: id,
                answer_id: *answer_id,
            });
        }
        id
    }

    pub fn add_grade_record(&self, id: i64, user_id: i64, exam_id: i64, status: GradeStatus) {
        let mut data = self.data.lock().unwrap();
        data.grade_records.insert(
            id,
            GradeRecord {
                id,
                user_id,
                exam_id,
                class_id: 1,
                status: status.as_str().to_string(),
                score: None,
                created_at: None,
            },
        );
    }

    pub fn grade_status(&self, id: i64) -> Option<(GradeStatus, Option<i64>)> {
        let data = self.data.lock().unwrap();
        data.grade_records
            .get(&id)
            .and_then(|r| r.status().map(|s| (s, r.score)))
    }

    pub fn evaluations(&self) -> Vec<NewEvaluation> {
        self.data.lock().unwrap().evaluations.clone()
    }

    pub fn response_count(&self) -> usize {
        self.data.lock().unwrap().responses.len()
    }
}

#[async_trait]
impl CorrectionStore for InMemoryStore {
    async fn grade_record(&self, id: i64) -> Result<Option<GradeRecord>, AppError> {
        Ok(self.data.lock().unwrap().grade_records.get(&id).cloned())
    }

    async fn exam(&self, exam_id: i64) -> Result<Option<Exam>, AppError> {
        Ok(self.data.lock().unwrap().exams.get(&exam_id).cloned())
    }

    async fn questions_by_exam(&self, exam_id: i64) -> Result<Vec<Question>, AppError> {
        Ok(self
            .data
            .lock()
            .unwrap()
            .questions
            .iter()
            .filter(|q| q.exam_id == exam_id)
            .cloned()
            .collect())
    }

    async fn answers_by_exam(&self, exam_id: i64) -> Result<Vec<Answer>, AppError> {
        Ok(self
            .data
            .lock()
            .unwrap()
            .answers
            .iter()
            .filter(|a| a.exam_id == exam_id)
            .cloned()
            .collect())
    }

    async fn responses_by_user_exam(
        &self,
        user_id: i64,
        exam_id: i64,
    ) -> Result<Vec<UserResponse>, AppError> {
        Ok(self
            .data
            .lock()
            .unwrap()
            .responses
            .iter()
            .filter(|r| r.user_id == user_id && r.exam_id == exam_id)
            .cloned()
            .collect())
    }

    async fn insert_empty_responses(
        &self,
        user_id: i64,
        exam_id: i64,
        question_ids: &[i64],
    ) -> Result<Vec<UserResponse>, AppError> {
        let mut data = self.data.lock().unwrap();
        let mut created = Vec::new();
        for question_id in question_ids {
            let id = data.next_id();
            let response = UserResponse {
                id,
                user_id,
                question_id: *question_id,
                exam_id,
                content: None,
                created_at: None,
            };
            data.responses.push(response.clone());
            created.push(response);
        }
        Ok(created)
    }

    async fn selected_answers(
        &self,
        response_ids: &[i64],
    ) -> Result<Vec<ResponseAnswer>, AppError> {
        let wanted: HashSet<i64> = response_ids.iter().copied().collect();
        Ok(self
            .data
            .lock()
            .unwrap()
            .links
            .iter()
            .filter(|l| wanted.contains(&l.response_id))
            .copied()
            .collect())
    }

    async fn apply_grading(
        &self,
        evaluations: &[NewEvaluation],
        update: &GradeUpdate,
    ) -> Result<(), AppError> {
        if self.fail_grading.load(Ordering::SeqCst) {
            return Err(AppError::InternalServerError("grading store down".to_string()));
        }

        let mut data = self.data.lock().unwrap();

        let record = data
            .grade_records
            .get_mut(&update.grade_record_id)
            .filter(|r| r.status() == Some(GradeStatus::InProgress))
            .ok_or_else(|| {
                AppError::Conflict("grade record not found or already finalized".to_string())
            })?;

        record.status = update.status.as_str().to_string();
        if let Some(score) = update.score {
            record.score = Some(score);
        }

        data.evaluations.extend_from_slice(evaluations);
        Ok(())
    }
}

/// Notification sink that records every emitted event.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<(String, String, Value)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events_named(&self, name: &str) -> Vec<(String, Value)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, event, _)| event == name)
            .map(|(channel, _, payload)| (channel.clone(), payload.clone()))
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn emit(&self, channel: &str, event: &str, payload: Value) {
        self.events
            .lock()
            .unwrap()
            .push((channel.to_string(), event.to_string(), payload));
    }
}
