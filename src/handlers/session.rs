// src/handlers/session.rs

use std::convert::Infallible;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use serde_json::json;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};

use crate::{
    error::AppError,
    models::grade::{GradeRecord, GradeStatus},
    services::notify::session_channel,
    state::AppState,
    utils::jwt::Claims,
};

use super::exam::fetch_exam;

/// Starts a timed session for the caller on an exam.
///
/// Creates the 'in_progress' grade record, then hands it to the session
/// manager, which arms the countdown watcher. A session already running
/// for the same (user, exam) is finalized as stopped first.
pub async fn start_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();
    let exam = fetch_exam(&state.pool, exam_id).await?;

    let record = sqlx::query_as::<_, GradeRecord>(
        r#"
        INSERT INTO grade_records (user_id, exam_id, class_id, status)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, exam_id, class_id, status, score, created_at
        "#,
    )
    .bind(user_id)
    .bind(exam_id)
    .bind(exam.class_id)
    .bind(GradeStatus::InProgress.as_str())
    .fetch_one(&state.pool)
    .await?;

    state
        .sessions
        .start(user_id, exam_id, record.id, exam.duration_seconds as u64)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "grade_record_id": record.id,
            "duration_seconds": exam.duration_seconds,
        })),
    ))
}

/// Stops the caller's running session and runs the correction pass.
pub async fn stop_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.sessions.stop(claims.user_id(), exam_id).await?;

    Ok(Json(json!({
        "success": true,
        "status": outcome.status,
        "score": outcome.score,
    })))
}

/// Remaining time of the caller's running session.
pub async fn remaining_time(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let timing = state
        .sessions
        .remaining_time(claims.user_id(), exam_id)
        .ok_or_else(|| AppError::NotFound("no active exam session".to_string()))?;

    Ok(Json(timing))
}

/// SSE stream of tick/finished events for the caller's session channel.
pub async fn session_events(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let channel = session_channel(claims.user_id(), exam_id);
    let receiver = state.notifier.subscribe(&channel);

    let stream = BroadcastStream::new(receiver).filter_map(|msg| {
        // Lagged receivers skip the missed ticks; the next one carries
        // fresh absolute values anyway.
        let notification = msg.ok()?;
        let event = Event::default()
            .event(notification.event)
            .json_data(&notification.payload)
            .ok()?;
        Some(Ok(event))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
