//! Error types for session configuration, the clock and the controller.

use serde::Serialize;
use thiserror::Error;

/// A session configuration that cannot be started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("target duration must be greater than zero seconds")]
    ZeroDuration,
    #[error("breathing pattern has no phases")]
    EmptyPattern,
    #[error("breathing pattern cycle length must be greater than zero")]
    ZeroLengthCycle,
    #[error("unknown breathing pattern `{0}`")]
    UnknownPattern(String),
    #[error("malformed breathing phase `{0}` (expected e.g. `inhale:4` or `i4`)")]
    MalformedPhase(String),
}

/// Failures of the tick source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClockError {
    /// No async runtime is available to schedule the ticker.
    #[error("no timer runtime available to schedule ticks")]
    Unavailable,
    /// The clock was cancelled and must be reset before reuse.
    #[error("clock has been cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Recoverable: fix the config and start a fresh controller.
    #[error("invalid session config: {0}")]
    InvalidConfig(#[from] ConfigError),
    /// The controller reached Completed or Cancelled; discard it.
    #[error("session already finished")]
    SessionAlreadyFinished,
    #[error("session already started")]
    SessionAlreadyStarted,
    /// Fatal runtime failure; the session is forced to Cancelled.
    #[error("session aborted: {0}")]
    SessionAborted(#[from] ClockError),
}

impl SessionError {
    /// Whether the error ended the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::SessionAborted(_))
    }
}
