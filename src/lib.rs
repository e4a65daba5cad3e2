//! Guided breathing session controller.
//!
//! A [`SessionController`] runs a breathing pattern (inhale, hold, exhale)
//! for a target duration on top of a pausable [`SessionClock`], and publishes
//! immutable [`SessionSnapshot`]s to any number of observers.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod utils;

pub mod breathing;
pub mod clock;
pub mod error;
pub mod history;
pub mod session;
pub mod settings;
pub mod soundscape;

pub use breathing::{BreathVisual, BreathingCycleEngine, BreathingPattern, PhaseKind};
pub use clock::{ClockConfig, SessionClock};
pub use error::{ClockError, ConfigError, SessionError};
pub use history::{HistoryRecorder, SessionOutcome, SessionRecord};
pub use session::{
    ChannelObserver, SessionConfig, SessionController, SessionEvent, SessionObserver,
    SessionOptions, SessionProgress, SessionSnapshot, SessionState, SoundscapeId, Subscription,
};
pub use settings::{MindfulSettings, SettingsStore};
pub use soundscape::{ChannelSoundscape, SilentSoundscape, Soundscape, SoundscapeCommand};
pub use utils::logging::{debug_enabled, init_logging};
