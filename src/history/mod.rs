//! In-memory record of finished sessions, the source for the
//! "Mindful Hour History" view.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;
use crate::session::{SessionObserver, SessionSnapshot, SessionState};

const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionOutcome {
    Completed,
    Cancelled,
    /// Cancelled because the clock failed.
    Aborted,
}

impl SessionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionOutcome::Completed => "Completed",
            SessionOutcome::Cancelled => "Cancelled",
            SessionOutcome::Aborted => "Aborted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub outcome: SessionOutcome,
    pub target_secs: u32,
    pub elapsed_secs: u32,
    pub cycles: u64,
}

/// Observer that keeps one record per finished session.
///
/// Subscribe a recorder to one controller at a time: a fatal error marks the
/// next cancellation it sees as an abort, and that mark is cleared whenever a
/// session (re)enters Running.
#[derive(Debug, Default)]
pub struct HistoryRecorder {
    records: Mutex<Vec<SessionRecord>>,
    abort_pending: AtomicBool,
}

impl HistoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SessionRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn records(&self) -> Vec<SessionRecord> {
        self.lock().clone()
    }

    pub fn completed_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|record| record.outcome == SessionOutcome::Completed)
            .count()
    }

    /// Seconds of completed sessions only.
    pub fn total_mindful_secs(&self) -> u64 {
        self.lock()
            .iter()
            .filter(|record| record.outcome == SessionOutcome::Completed)
            .map(|record| u64::from(record.elapsed_secs))
            .sum()
    }

    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&*self.lock())
    }

    fn record(&self, snapshot: SessionSnapshot, outcome: SessionOutcome) {
        let Some(id) = snapshot.session_id else {
            return;
        };
        let ended_at = Utc::now();
        let record = SessionRecord {
            id,
            started_at: snapshot.started_at.unwrap_or(ended_at),
            ended_at,
            outcome,
            target_secs: snapshot.target_secs,
            elapsed_secs: snapshot.progress.elapsed_secs,
            cycles: snapshot.progress.cycle_index,
        };
        log_info!(
            "recorded session {} as {} ({}s of {}s)",
            record.id,
            outcome.as_str(),
            record.elapsed_secs,
            record.target_secs
        );
        self.lock().push(record);
    }
}

impl SessionObserver for HistoryRecorder {
    fn on_state_changed(&self, snapshot: SessionSnapshot) {
        if snapshot.state == SessionState::Running {
            self.abort_pending.store(false, Ordering::SeqCst);
        }
    }

    fn on_completed(&self, snapshot: SessionSnapshot) {
        self.record(snapshot, SessionOutcome::Completed);
    }

    fn on_cancelled(&self, snapshot: SessionSnapshot) {
        let outcome = if self.abort_pending.swap(false, Ordering::SeqCst) {
            SessionOutcome::Aborted
        } else {
            SessionOutcome::Cancelled
        };
        self.record(snapshot, outcome);
    }

    fn on_error(&self, error: SessionError) {
        if error.is_fatal() {
            self.abort_pending.store(true, Ordering::SeqCst);
        }
    }
}
