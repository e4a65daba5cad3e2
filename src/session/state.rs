use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::breathing::{BreathingCycleEngine, BreathingPattern, CyclePosition, PhaseKind};
use crate::error::{ClockError, ConfigError, SessionError};

use super::observer::SessionEvent;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Cancelled,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Running => "Running",
            SessionState::Paused => "Paused",
            SessionState::Completed => "Completed",
            SessionState::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Cancelled)
    }

    /// Running or paused.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Running | SessionState::Paused)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque soundscape reference; only the soundscape collaborator reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SoundscapeId(pub String);

impl SoundscapeId {
    pub fn silence() -> Self {
        Self("silence".into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SoundscapeId {
    fn default() -> Self {
        Self::silence()
    }
}

impl From<&str> for SoundscapeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SoundscapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub target_secs: u32,
    pub pattern: BreathingPattern,
    pub soundscape: SoundscapeId,
}

impl SessionConfig {
    pub fn new(target_secs: u32, pattern: BreathingPattern, soundscape: SoundscapeId) -> Self {
        Self {
            target_secs,
            pattern,
            soundscape,
        }
    }

    pub fn from_minutes(minutes: u32, pattern: BreathingPattern) -> Self {
        Self::new(minutes.saturating_mul(60), pattern, SoundscapeId::default())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_secs == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        self.pattern.validate()
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    pub elapsed_secs: u32,
    pub phase: PhaseKind,
    pub phase_elapsed_secs: u32,
    pub phase_duration_secs: u32,
    pub cycle_index: u64,
}

impl SessionProgress {
    fn at(elapsed_secs: u32, position: CyclePosition) -> Self {
        Self {
            elapsed_secs,
            phase: position.phase,
            phase_elapsed_secs: position.phase_elapsed_secs,
            phase_duration_secs: position.phase_duration_secs,
            cycle_index: position.cycle_index,
        }
    }
}

/// Immutable copy of the controller's state handed to observers.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Option<Uuid>,
    pub state: SessionState,
    pub progress: SessionProgress,
    pub target_secs: u32,
    pub remaining_secs: u32,
    pub started_at: Option<DateTime<Utc>>,
    /// Increases with every published change of this controller.
    pub revision: u64,
}

impl SessionSnapshot {
    /// Fraction of the target completed, `0.0..=1.0`.
    pub fn fraction_complete(&self) -> f64 {
        if self.target_secs == 0 {
            return 0.0;
        }
        f64::from(self.progress.elapsed_secs) / f64::from(self.target_secs)
    }
}

/// The session state machine, free of clocks and I/O.
///
/// Every method that changes state returns the events to publish; the
/// controller wraps this with the clock and observer dispatch.
#[derive(Debug, Clone)]
pub struct SessionCore {
    state: SessionState,
    config: SessionConfig,
    engine: BreathingCycleEngine,
    session_id: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,
    elapsed_secs: u32,
    revision: u64,
}

impl SessionCore {
    pub fn new(config: SessionConfig) -> Self {
        let engine = BreathingCycleEngine::new(config.pattern.clone());
        Self {
            state: SessionState::Idle,
            config,
            engine,
            session_id: None,
            started_at: None,
            elapsed_secs: 0,
            revision: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            state: self.state,
            progress: SessionProgress::at(self.elapsed_secs, self.engine.position()),
            target_secs: self.config.target_secs,
            remaining_secs: self.config.target_secs.saturating_sub(self.elapsed_secs),
            started_at: self.started_at,
            revision: self.revision,
        }
    }

    fn transition(&mut self, state: SessionState) -> SessionSnapshot {
        self.state = state;
        self.revision += 1;
        self.snapshot()
    }

    /// Idle -> Running.
    pub fn start(&mut self, session_id: Uuid, now: DateTime<Utc>) -> Result<SessionEvent, SessionError> {
        match self.state {
            SessionState::Idle => {}
            SessionState::Running | SessionState::Paused => {
                return Err(SessionError::SessionAlreadyStarted)
            }
            SessionState::Completed | SessionState::Cancelled => {
                return Err(SessionError::SessionAlreadyFinished)
            }
        }
        self.config.validate()?;

        self.session_id = Some(session_id);
        self.started_at = Some(now);
        self.elapsed_secs = 0;
        self.engine = BreathingCycleEngine::new(self.config.pattern.clone());
        Ok(SessionEvent::StateChanged(self.transition(SessionState::Running)))
    }

    pub fn pause(&mut self) -> Option<SessionEvent> {
        if self.state != SessionState::Running {
            return None;
        }
        Some(SessionEvent::StateChanged(self.transition(SessionState::Paused)))
    }

    pub fn resume(&mut self) -> Option<SessionEvent> {
        if self.state != SessionState::Paused {
            return None;
        }
        Some(SessionEvent::StateChanged(self.transition(SessionState::Running)))
    }

    pub fn cancel(&mut self) -> Option<SessionEvent> {
        if !self.state.is_active() {
            return None;
        }
        Some(SessionEvent::Cancelled(self.transition(SessionState::Cancelled)))
    }

    /// Fatal clock failure: report the error, then cancel.
    pub fn abort(&mut self, error: ClockError) -> Vec<SessionEvent> {
        if !self.state.is_active() {
            return Vec::new();
        }
        let mut events = vec![SessionEvent::Error(SessionError::SessionAborted(error))];
        events.extend(self.cancel());
        events
    }

    /// Applies one clock tick worth `unit_secs` of session time.
    ///
    /// Returns `None` unless running. The tick that reaches the target clamps
    /// elapsed time to it and yields `Completed` instead of `Progress`.
    pub fn tick(&mut self, unit_secs: u32) -> Option<SessionEvent> {
        if self.state != SessionState::Running {
            return None;
        }

        let target = self.config.target_secs;
        let next = self.elapsed_secs.saturating_add(unit_secs).min(target);
        let step = next - self.elapsed_secs;
        self.elapsed_secs = next;
        self.engine.advance(step);

        if self.elapsed_secs >= target {
            Some(SessionEvent::Completed(self.transition(SessionState::Completed)))
        } else {
            self.revision += 1;
            Some(SessionEvent::Progress(self.snapshot()))
        }
    }
}
