// tests/correction_tests.rs
//
// Correction-engine behavior against the in-memory store.

mod common;

use common::InMemoryStore;
use examtrack::error::AppError;
use examtrack::models::grade::GradeStatus;
use examtrack::services::correction::correct_exam;

const USER: i64 = 100;
const TEACHER: i64 = 200;
const EXAM: i64 = 1;
const RECORD: i64 = 1000;

fn store_with_exam() -> InMemoryStore {
    let store = InMemoryStore::new();
    store.add_exam(EXAM, TEACHER, 600);
    store.add_grade_record(RECORD, USER, EXAM, GradeStatus::InProgress);
    store
}

#[tokio::test]
async fn fully_auto_exam_is_graded_with_summed_score() {
    let store = store_with_exam();

    // Question 1 answered correctly, question 2 answered wrong.
    let q1 = store.add_question(EXAM, true, false, 10.0);
    let a1 = store.add_answer(EXAM, q1, true);
    store.add_answer(EXAM, q1, false);
    store.add_response(USER, EXAM, q1, &[a1]);

    let q2 = store.add_question(EXAM, true, false, 5.0);
    store.add_answer(EXAM, q2, true);
    let a2_wrong = store.add_answer(EXAM, q2, false);
    store.add_response(USER, EXAM, q2, &[a2_wrong]);

    let outcome = correct_exam(&store, USER, EXAM, RECORD).await.unwrap();

    assert_eq!(outcome.status, GradeStatus::Graded);
    assert_eq!(outcome.score, Some(10));
    assert_eq!(store.grade_status(RECORD), Some((GradeStatus::Graded, Some(10))));

    let evals = store.evaluations();
    assert_eq!(evals.len(), 2);
    assert!(evals.iter().all(|e| e.student_id == USER && e.teacher_id == TEACHER));
    let notes: Vec<i64> = evals.iter().map(|e| e.note).collect();
    assert!(notes.contains(&10) && notes.contains(&0));
}

#[tokio::test]
async fn free_text_question_pends_manual_grading() {
    let store = store_with_exam();

    let q1 = store.add_question(EXAM, true, false, 10.0);
    let a1 = store.add_answer(EXAM, q1, true);
    store.add_response(USER, EXAM, q1, &[a1]);

    // Free-text question, answered but not auto-gradable.
    let q2 = store.add_question(EXAM, false, false, 10.0);
    store.add_response(USER, EXAM, q2, &[]);

    let outcome = correct_exam(&store, USER, EXAM, RECORD).await.unwrap();

    assert_eq!(outcome.status, GradeStatus::PendingManual);
    assert_eq!(outcome.score, None);
    // Score stays unset on the record even though the choice question was
    // evaluated and persisted.
    assert_eq!(
        store.grade_status(RECORD),
        Some((GradeStatus::PendingManual, None))
    );
    assert_eq!(store.evaluations().len(), 1);
    assert_eq!(store.evaluations()[0].note, 10);
}

#[tokio::test]
async fn unanswered_question_scores_zero_via_synthesized_response() {
    let store = store_with_exam();

    let q1 = store.add_question(EXAM, true, false, 10.0);
    store.add_answer(EXAM, q1, true);
    // No response submitted at all.
    assert_eq!(store.response_count(), 0);

    let outcome = correct_exam(&store, USER, EXAM, RECORD).await.unwrap();

    assert_eq!(outcome.status, GradeStatus::Graded);
    assert_eq!(outcome.score, Some(0));
    // An empty response was synthesized and evaluated.
    assert_eq!(store.response_count(), 1);
    assert_eq!(store.evaluations().len(), 1);
    assert_eq!(store.evaluations()[0].note, 0);
}

#[tokio::test]
async fn multi_answer_requires_exact_set_match() {
    // Three users attempt the same two-correct-answer question with the
    // selections {A}, {A,B} and {A,B,C}.
    let store = InMemoryStore::new();
    store.add_exam(EXAM, TEACHER, 600);
    let q = store.add_question(EXAM, true, true, 8.0);
    let a = store.add_answer(EXAM, q, true);
    let b = store.add_answer(EXAM, q, true);
    let c = store.add_answer(EXAM, q, false);

    let cases: [(i64, Vec<i64>, i64); 3] = [
        (1, vec![a], 0),
        (2, vec![a, b], 8),
        (3, vec![a, b, c], 0),
    ];

    for (user, selection, expected) in cases {
        let record = 2000 + user;
        store.add_grade_record(record, user, EXAM, GradeStatus::InProgress);
        store.add_response(user, EXAM, q, &selection);

        let outcome = correct_exam(&store, user, EXAM, record).await.unwrap();
        assert_eq!(
            outcome.score,
            Some(expected),
            "selection {:?} should score {}",
            selection,
            expected
        );
    }
}

#[tokio::test]
async fn single_answer_rejects_multiple_selections() {
    let store = InMemoryStore::new();
    store.add_exam(EXAM, TEACHER, 600);
    let q = store.add_question(EXAM, true, false, 10.0);
    let a = store.add_answer(EXAM, q, true);
    let b = store.add_answer(EXAM, q, false);

    let cases: [(i64, Vec<i64>, i64); 3] = [
        (1, vec![a], 10),
        (2, vec![], 0),
        (3, vec![a, b], 0),
    ];

    for (user, selection, expected) in cases {
        let record = 3000 + user;
        store.add_grade_record(record, user, EXAM, GradeStatus::InProgress);
        store.add_response(user, EXAM, q, &selection);

        let outcome = correct_exam(&store, user, EXAM, record).await.unwrap();
        assert_eq!(outcome.score, Some(expected));
    }
}

#[tokio::test]
async fn already_finalized_record_is_rejected_without_mutation() {
    let store = InMemoryStore::new();
    store.add_exam(EXAM, TEACHER, 600);
    store.add_grade_record(RECORD, USER, EXAM, GradeStatus::Graded);
    let q = store.add_question(EXAM, true, false, 10.0);
    store.add_answer(EXAM, q, true);

    let result = correct_exam(&store, USER, EXAM, RECORD).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(store.evaluations().is_empty());
    assert_eq!(store.response_count(), 0);
}

#[tokio::test]
async fn record_for_another_user_is_rejected() {
    let store = store_with_exam();
    store.add_question(EXAM, true, false, 10.0);

    let result = correct_exam(&store, USER + 1, EXAM, RECORD).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(store.grade_status(RECORD), Some((GradeStatus::InProgress, None)));
}
