// src/services/session.rs

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex, MutexGuard, Weak,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::error::AppError;

use super::correction::{self, CorrectionOutcome, CorrectionStore};
use super::notify::{FINISHED_EVENT, NotificationSink, TICK_EVENT, session_channel};

/// Cadence of the per-session countdown watcher.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// A session is identified by (user_id, exam_id). Deliberately not scoped
/// by class: one student cannot run the same exam twice concurrently, even
/// across different classes.
pub type SessionKey = (i64, i64);

/// Why a session was finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The allotted duration ran out.
    Timeout,
    /// The student (or a replacing start) ended the attempt early.
    Stopped,
}

impl FinishReason {
    fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Timeout => "timeout",
            FinishReason::Stopped => "stopped",
        }
    }
}

/// Live timing snapshot of a running session. Always recomputed from the
/// start instant, never cached, so polling agrees with the watcher ticks.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SessionTiming {
    pub elapsed_seconds: u64,
    pub remaining_seconds: u64,
    pub duration_seconds: u64,
}

/// Public view of a registry entry.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SessionInfo {
    pub grade_record_id: i64,
    #[serde(flatten)]
    pub timing: SessionTiming,
}

struct ActiveSession {
    grade_record_id: i64,
    started_at: Instant,
    duration_seconds: u64,
    /// Checked at the top of every tick, so cancellation wins even when it
    /// races the watcher firing.
    cancelled: Arc<AtomicBool>,
    watcher: JoinHandle<()>,
}

impl ActiveSession {
    fn timing(&self) -> SessionTiming {
        let elapsed = self.started_at.elapsed().as_secs();
        SessionTiming {
            elapsed_seconds: elapsed,
            remaining_seconds: self.duration_seconds.saturating_sub(elapsed),
            duration_seconds: self.duration_seconds,
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.watcher.abort();
    }
}

/// Tracks every in-progress timed exam attempt and drives time-based
/// finalization. One watcher task per session ticks once per second,
/// pushes the countdown to the notification sink and triggers the
/// correction pass when the deadline passes or the attempt is stopped.
pub struct SessionManager {
    sessions: Mutex<HashMap<SessionKey, ActiveSession>>,
    store: Arc<dyn CorrectionStore>,
    sink: Arc<dyn NotificationSink>,
    /// Handle to ourselves for the watcher tasks; upgrading fails only
    /// after the manager has been dropped, at which point nothing should
    /// be finalized anymore.
    self_ref: Weak<SessionManager>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn CorrectionStore>, sink: Arc<dyn NotificationSink>) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| SessionManager {
            sessions: Mutex::new(HashMap::new()),
            store,
            sink,
            self_ref: self_ref.clone(),
        })
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<SessionKey, ActiveSession>> {
        self.sessions.lock().expect("session registry lock poisoned")
    }

    /// Starts a timed session for (user, exam) against an already created
    /// 'in_progress' grade record.
    ///
    /// If a session already exists for the key it is finalized as stopped
    /// first, so its grade record cannot be left 'in_progress' forever.
    /// The new watcher emits its first tick immediately with elapsed = 0.
    pub async fn start(
        &self,
        user_id: i64,
        exam_id: i64,
        grade_record_id: i64,
        duration_seconds: u64,
    ) {
        let key = (user_id, exam_id);

        let replaced = self.registry().remove(&key);
        if let Some(old) = replaced {
            tracing::warn!(
                "user {} restarted exam {} with a session still running; finalizing the old attempt",
                user_id,
                exam_id
            );
            if let Err(e) = self.finish(key, old, FinishReason::Stopped).await {
                tracing::error!(
                    "failed to finalize replaced session for user {} exam {}: {}",
                    user_id,
                    exam_id,
                    e
                );
            }
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let started_at = Instant::now();

        let watcher = tokio::spawn({
            let manager = self.self_ref.clone();
            let sink = Arc::clone(&self.sink);
            let cancelled = Arc::clone(&cancelled);
            let channel = session_channel(user_id, exam_id);
            async move {
                let mut ticker = time::interval(TICK_INTERVAL);
                loop {
                    ticker.tick().await;
                    if cancelled.load(Ordering::SeqCst) {
                        break;
                    }

                    let elapsed = started_at.elapsed().as_secs();
                    let remaining = duration_seconds.saturating_sub(elapsed);

                    sink.emit(
                        &channel,
                        TICK_EVENT,
                        json!({
                            "elapsedInSeconds": elapsed,
                            "remainingInSeconds": remaining,
                            "durationInSeconds": duration_seconds,
                        }),
                    )
                    .await;

                    if elapsed >= duration_seconds {
                        // Finalization gets its own task: finalize() aborts
                        // this watcher handle and must not take the running
                        // correction down with it.
                        if let Some(manager) = manager.upgrade() {
                            tokio::spawn(async move {
                                if let Err(e) = manager
                                    .finalize(user_id, exam_id, FinishReason::Timeout)
                                    .await
                                {
                                    tracing::warn!(
                                        "timeout finalization for user {} exam {} failed: {}",
                                        user_id,
                                        exam_id,
                                        e
                                    );
                                }
                            });
                        }
                        break;
                    }
                }
            }
        });

        let session = ActiveSession {
            grade_record_id,
            started_at,
            duration_seconds,
            cancelled,
            watcher,
        };

        // A racing start for the same key may have slipped in while the old
        // session was being finalized; treat whatever we displace like the
        // session we just replaced.
        let displaced = self.registry().insert(key, session);
        if let Some(old) = displaced {
            old.cancel();
            if let Some(manager) = self.self_ref.upgrade() {
                tokio::spawn(async move {
                    if let Err(e) = manager.finish(key, old, FinishReason::Stopped).await {
                        tracing::error!(
                            "failed to finalize displaced session for user {} exam {}: {}",
                            user_id,
                            exam_id,
                            e
                        );
                    }
                });
            }
        }

        tracing::info!(
            "started exam session: user {} exam {} grade record {} duration {}s",
            user_id,
            exam_id,
            grade_record_id,
            duration_seconds
        );
    }

    /// Ends an attempt early. Error result if no session is active.
    pub async fn stop(
        &self,
        user_id: i64,
        exam_id: i64,
    ) -> Result<CorrectionOutcome, AppError> {
        self.finalize(user_id, exam_id, FinishReason::Stopped).await
    }

    /// Removes the session and runs the correction pass.
    ///
    /// The entry is taken out of the registry before correction runs, so a
    /// concurrent start on the same key can never arm a duplicate watcher;
    /// a double correction attempt is instead rejected by the grade
    /// record's status precondition. The entry stays removed whatever the
    /// correction outcome.
    pub async fn finalize(
        &self,
        user_id: i64,
        exam_id: i64,
        reason: FinishReason,
    ) -> Result<CorrectionOutcome, AppError> {
        let key = (user_id, exam_id);

        let Some(session) = self.registry().remove(&key) else {
            tracing::warn!(
                "finalize({}) for user {} exam {}: no active exam session",
                reason.as_str(),
                user_id,
                exam_id
            );
            return Err(AppError::NotFound("no active exam session".to_string()));
        };

        self.finish(key, session, reason).await
    }

    /// Cancels the watcher, runs correction and emits the finished event.
    /// The session has already been removed from the registry.
    async fn finish(
        &self,
        key: SessionKey,
        session: ActiveSession,
        reason: FinishReason,
    ) -> Result<CorrectionOutcome, AppError> {
        session.cancel();

        let (user_id, exam_id) = key;
        let result =
            correction::correct_exam(self.store.as_ref(), user_id, exam_id, session.grade_record_id)
                .await;

        let channel = session_channel(user_id, exam_id);
        match &result {
            Ok(outcome) => {
                tracing::info!(
                    "exam session finished ({}): user {} exam {} -> {:?}",
                    reason.as_str(),
                    user_id,
                    exam_id,
                    outcome.status
                );
                self.sink
                    .emit(
                        &channel,
                        FINISHED_EVENT,
                        json!({
                            "success": true,
                            "message": format!("exam finished ({})", reason.as_str()),
                        }),
                    )
                    .await;
            }
            Err(e) => {
                tracing::error!(
                    "correction failed ({}): user {} exam {}: {}",
                    reason.as_str(),
                    user_id,
                    exam_id,
                    e
                );
                self.sink
                    .emit(
                        &channel,
                        FINISHED_EVENT,
                        json!({
                            "success": false,
                            "message": "exam correction failed",
                        }),
                    )
                    .await;
            }
        }

        result
    }

    /// Pure lookup of a running session.
    pub fn active_session(&self, user_id: i64, exam_id: i64) -> Option<SessionInfo> {
        self.registry().get(&(user_id, exam_id)).map(|s| SessionInfo {
            grade_record_id: s.grade_record_id,
            timing: s.timing(),
        })
    }

    /// Live remaining-time lookup, recomputed on every call.
    pub fn remaining_time(&self, user_id: i64, exam_id: i64) -> Option<SessionTiming> {
        self.registry().get(&(user_id, exam_id)).map(|s| s.timing())
    }

    /// Number of currently running sessions.
    pub fn active_count(&self) -> usize {
        self.registry().len()
    }

    /// Cancels every watcher and clears the registry. Sessions still active
    /// are not corrected; their grade records stay 'in_progress' for a
    /// teacher to resolve.
    pub fn shutdown(&self) {
        let mut registry = self.registry();
        let count = registry.len();
        for (_, session) in registry.drain() {
            session.cancel();
        }
        if count > 0 {
            tracing::warn!("shut down session registry with {} active sessions", count);
        }
    }
}
