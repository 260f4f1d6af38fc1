// tests/session_tests.rs
//
// Session registry and timer behavior, driven with the paused tokio clock
// so watcher ticks and deadlines are deterministic.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{InMemoryStore, RecordingSink};
use examtrack::error::AppError;
use examtrack::models::grade::GradeStatus;
use examtrack::services::notify::{FINISHED_EVENT, TICK_EVENT, session_channel};
use examtrack::services::session::SessionManager;

const USER: i64 = 100;
const TEACHER: i64 = 200;
const EXAM: i64 = 1;
const RECORD: i64 = 1000;

struct Harness {
    store: Arc<InMemoryStore>,
    sink: Arc<RecordingSink>,
    manager: Arc<SessionManager>,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let sink = Arc::new(RecordingSink::new());
    let manager = SessionManager::new(store.clone(), sink.clone());
    Harness {
        store,
        sink,
        manager,
    }
}

/// One auto-gradable question answered correctly, worth 10 points.
fn seed_answered_exam(store: &InMemoryStore, user: i64, record: i64) {
    store.add_exam(EXAM, TEACHER, 600);
    store.add_grade_record(record, user, EXAM, GradeStatus::InProgress);
    let q = store.add_question(EXAM, true, false, 10.0);
    let a = store.add_answer(EXAM, q, true);
    store.add_response(user, EXAM, q, &[a]);
}

/// Lets spawned finalization tasks run to completion.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn timeout_finalizes_exactly_once() {
    let h = harness();
    seed_answered_exam(&h.store, USER, RECORD);

    h.manager.start(USER, EXAM, RECORD, 3).await;

    tokio::time::sleep(Duration::from_millis(4500)).await;
    settle().await;

    assert_eq!(h.manager.active_count(), 0);
    assert_eq!(
        h.store.grade_status(RECORD),
        Some((GradeStatus::Graded, Some(10)))
    );

    let finished = h.sink.events_named(FINISHED_EVENT);
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].0, session_channel(USER, EXAM));
    assert_eq!(finished[0].1["success"], true);
}

#[tokio::test(start_paused = true)]
async fn first_tick_fires_immediately_with_zero_elapsed() {
    let h = harness();
    seed_answered_exam(&h.store, USER, RECORD);

    h.manager.start(USER, EXAM, RECORD, 60).await;

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let ticks = h.sink.events_named(TICK_EVENT);
    assert!(ticks.len() >= 2, "expected at least two ticks, got {}", ticks.len());
    assert_eq!(ticks[0].1["elapsedInSeconds"], 0);
    assert_eq!(ticks[0].1["remainingInSeconds"], 60);
    assert_eq!(ticks[0].1["durationInSeconds"], 60);
    assert_eq!(ticks[1].1["elapsedInSeconds"], 1);
    assert_eq!(ticks[1].1["remainingInSeconds"], 59);
}

#[tokio::test(start_paused = true)]
async fn stop_finalizes_and_silences_the_watcher() {
    let h = harness();
    seed_answered_exam(&h.store, USER, RECORD);

    h.manager.start(USER, EXAM, RECORD, 60).await;
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let outcome = h.manager.stop(USER, EXAM).await.unwrap();
    assert_eq!(outcome.status, GradeStatus::Graded);
    assert_eq!(outcome.score, Some(10));
    assert_eq!(h.manager.active_count(), 0);

    let ticks_at_stop = h.sink.events_named(TICK_EVENT).len();
    tokio::time::sleep(Duration::from_secs(5)).await;
    settle().await;

    assert_eq!(h.sink.events_named(TICK_EVENT).len(), ticks_at_stop);
    assert_eq!(h.sink.events_named(FINISHED_EVENT).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_without_session_is_an_error_and_mutates_nothing() {
    let h = harness();
    seed_answered_exam(&h.store, USER, RECORD);

    let result = h.manager.stop(USER, EXAM).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(
        h.store.grade_status(RECORD),
        Some((GradeStatus::InProgress, None))
    );
    assert!(h.store.evaluations().is_empty());
    assert!(h.sink.events_named(FINISHED_EVENT).is_empty());
}

#[tokio::test(start_paused = true)]
async fn remaining_time_is_recomputed_live() {
    let h = harness();
    seed_answered_exam(&h.store, USER, RECORD);

    h.manager.start(USER, EXAM, RECORD, 10).await;
    tokio::time::sleep(Duration::from_secs(3)).await;

    let timing = h.manager.remaining_time(USER, EXAM).unwrap();
    assert_eq!(timing.elapsed_seconds, 3);
    assert_eq!(timing.remaining_seconds, 7);
    assert_eq!(timing.duration_seconds, 10);

    assert!(h.manager.remaining_time(USER, EXAM + 1).is_none());
}

#[tokio::test(start_paused = true)]
async fn restart_collapses_to_one_session_and_resolves_the_old_grade() {
    let h = harness();
    seed_answered_exam(&h.store, USER, RECORD);
    let second_record = RECORD + 1;
    h.store
        .add_grade_record(second_record, USER, EXAM, GradeStatus::InProgress);

    h.manager.start(USER, EXAM, RECORD, 60).await;
    tokio::time::sleep(Duration::from_secs(2)).await;
    h.manager.start(USER, EXAM, second_record, 120).await;
    settle().await;

    // Only the second session remains, with the second duration in effect.
    assert_eq!(h.manager.active_count(), 1);
    let info = h.manager.active_session(USER, EXAM).unwrap();
    assert_eq!(info.grade_record_id, second_record);
    assert_eq!(info.timing.duration_seconds, 120);

    // The replaced attempt was finalized as stopped, not left in progress.
    assert_eq!(
        h.store.grade_status(RECORD),
        Some((GradeStatus::Graded, Some(10)))
    );
    assert_eq!(
        h.store.grade_status(second_record),
        Some((GradeStatus::InProgress, None))
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_watchers_without_correction() {
    let h = harness();
    seed_answered_exam(&h.store, USER, RECORD);

    h.manager.start(USER, EXAM, RECORD, 5).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    h.manager.shutdown();
    assert_eq!(h.manager.active_count(), 0);

    // Past the would-be deadline: no correction ran, no finished event.
    tokio::time::sleep(Duration::from_secs(10)).await;
    settle().await;

    assert_eq!(
        h.store.grade_status(RECORD),
        Some((GradeStatus::InProgress, None))
    );
    assert!(h.sink.events_named(FINISHED_EVENT).is_empty());
}

#[tokio::test(start_paused = true)]
async fn correction_failure_still_clears_the_session_and_reports_it() {
    let h = harness();
    seed_answered_exam(&h.store, USER, RECORD);
    h.store.fail_grading.store(true, Ordering::SeqCst);

    h.manager.start(USER, EXAM, RECORD, 60).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    let result = h.manager.stop(USER, EXAM).await;

    assert!(matches!(result, Err(AppError::InternalServerError(_))));
    assert_eq!(h.manager.active_count(), 0);

    let finished = h.sink.events_named(FINISHED_EVENT);
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].1["success"], false);
}
