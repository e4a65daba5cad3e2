use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::Utc;
use uuid::Uuid;

use crate::clock::{ClockConfig, ClockTick, SessionClock};
use crate::error::SessionError;
use crate::soundscape::{SilentSoundscape, Soundscape, SoundscapeError};
use crate::utils::logging::debug_enabled;

use super::observer::{Dispatcher, SessionEvent, SessionObserver, Subscription};
use super::state::{SessionConfig, SessionCore, SessionSnapshot, SessionState};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub struct SessionOptions {
    pub clock: ClockConfig,
    pub soundscape: Arc<dyn Soundscape>,
    /// Log a progress line every this many ticks.
    pub heartbeat_every_ticks: u64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            clock: ClockConfig::default(),
            soundscape: Arc::new(SilentSoundscape),
            heartbeat_every_ticks: if debug_enabled() { 1 } else { 10 },
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SoundCue {
    Play,
    Pause,
    Resume,
    Stop,
}

struct Shared {
    core: Mutex<SessionCore>,
    clock: SessionClock,
    dispatcher: Arc<Dispatcher>,
    soundscape: Arc<dyn Soundscape>,
    unit_secs: u32,
    heartbeat_every_ticks: u64,
}

/// Drives one breathing session: owns the state machine, the clock and the
/// observer list.
///
/// Commands never block on the session. Lock order is core, then clock, then
/// the dispatcher outbox; observers are called with no lock held.
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        Self::with_options(config, SessionOptions::default())
    }

    pub fn with_options(config: SessionConfig, options: SessionOptions) -> Result<Self, SessionError> {
        config.validate()?;

        let SessionOptions {
            clock: clock_config,
            soundscape,
            heartbeat_every_ticks,
        } = options;

        let shared = Arc::new_cyclic(|weak: &Weak<Shared>| {
            let weak = weak.clone();
            let clock = SessionClock::new(clock_config.period, move |tick| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_tick(tick);
                }
            });

            Shared {
                core: Mutex::new(SessionCore::new(config)),
                clock,
                dispatcher: Arc::new(Dispatcher::default()),
                soundscape,
                unit_secs: clock_config.unit_secs.max(1),
                heartbeat_every_ticks: heartbeat_every_ticks.max(1),
            }
        });

        Ok(Self { shared })
    }

    pub fn subscribe(&self, observer: Arc<dyn SessionObserver>) -> Subscription {
        self.shared.dispatcher.subscribe(observer)
    }

    pub fn observer_count(&self) -> usize {
        self.shared.dispatcher.observer_count()
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock_core().state()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.lock_core().snapshot()
    }

    pub fn config(&self) -> SessionConfig {
        self.shared.lock_core().config().clone()
    }

    /// Starts the session. Only configuration and lifecycle errors are
    /// returned; a clock failure is reported to observers and cancels.
    pub fn start(&self) -> Result<(), SessionError> {
        let started = {
            let mut core = self.shared.lock_core();
            let event = core.start(Uuid::new_v4(), Utc::now())?;
            self.shared.dispatcher.enqueue([event]);

            match self.shared.clock.start() {
                Ok(()) => {
                    log_info!(
                        "session {} started: {}s, pattern {}",
                        display_id(core.session_id()),
                        core.config().target_secs,
                        core.config().pattern
                    );
                    true
                }
                Err(err) => {
                    log_error!("session {} aborted on start: {err}", display_id(core.session_id()));
                    self.shared.dispatcher.enqueue(core.abort(err));
                    false
                }
            }
        };

        if started {
            self.shared.cue(SoundCue::Play);
        }
        self.shared.dispatcher.drain();
        Ok(())
    }

    pub fn pause(&self) {
        let paused = {
            let mut core = self.shared.lock_core();
            match core.pause() {
                Some(event) => {
                    self.shared.clock.pause();
                    self.shared.dispatcher.enqueue([event]);
                    log_info!(
                        "session {} paused at {}s",
                        display_id(core.session_id()),
                        core.snapshot().progress.elapsed_secs
                    );
                    true
                }
                None => false,
            }
        };

        if paused {
            self.shared.cue(SoundCue::Pause);
        }
        self.shared.dispatcher.drain();
    }

    pub fn resume(&self) {
        let cue = {
            let mut core = self.shared.lock_core();
            match core.resume() {
                Some(event) => {
                    self.shared.dispatcher.enqueue([event]);
                    match self.shared.clock.resume() {
                        Ok(()) => {
                            log_info!("session {} resumed", display_id(core.session_id()));
                            Some(SoundCue::Resume)
                        }
                        Err(err) => {
                            log_error!("session {} aborted on resume: {err}", display_id(core.session_id()));
                            self.shared.dispatcher.enqueue(core.abort(err));
                            self.shared.clock.cancel();
                            Some(SoundCue::Stop)
                        }
                    }
                }
                None => None,
            }
        };

        if let Some(cue) = cue {
            self.shared.cue(cue);
        }
        self.shared.dispatcher.drain();
    }

    pub fn cancel(&self) {
        let cancelled = {
            let mut core = self.shared.lock_core();
            match core.cancel() {
                Some(event) => {
                    self.shared.clock.cancel();
                    log_info!(
                        "session {} cancelled at {}s",
                        display_id(core.session_id()),
                        event.snapshot().map(|s| s.progress.elapsed_secs).unwrap_or(0)
                    );
                    self.shared.dispatcher.enqueue([event]);
                    true
                }
                None => false,
            }
        };

        if cancelled {
            self.shared.cue(SoundCue::Stop);
        }
        self.shared.dispatcher.drain();
    }
}

impl Shared {
    fn lock_core(&self) -> MutexGuard<'_, SessionCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_tick(&self, tick: ClockTick) {
        let finished = {
            let mut core = self.lock_core();
            if !self.clock.accept(tick) {
                return;
            }
            let Some(event) = core.tick(self.unit_secs) else {
                return;
            };

            let finished = matches!(event, SessionEvent::Completed(_));
            if finished {
                self.clock.cancel();
                log_info!(
                    "session {} completed after {} ticks",
                    display_id(core.session_id()),
                    tick.count
                );
            } else if tick.count % self.heartbeat_every_ticks == 0 {
                if let Some(snapshot) = event.snapshot() {
                    log_info!(
                        "session {} heartbeat: {}/{}s, {} {}/{}s, cycle {}",
                        display_id(snapshot.session_id),
                        snapshot.progress.elapsed_secs,
                        snapshot.target_secs,
                        snapshot.progress.phase,
                        snapshot.progress.phase_elapsed_secs,
                        snapshot.progress.phase_duration_secs,
                        snapshot.progress.cycle_index
                    );
                }
            }

            self.dispatcher.enqueue([event]);
            finished
        };

        if finished {
            self.cue(SoundCue::Stop);
        }
        self.dispatcher.drain();
    }

    fn cue(&self, cue: SoundCue) {
        let result: Result<(), SoundscapeError> = match cue {
            SoundCue::Play => {
                let id = self.lock_core().config().soundscape.clone();
                self.soundscape.play(&id)
            }
            SoundCue::Pause => self.soundscape.pause(),
            SoundCue::Resume => self.soundscape.resume(),
            SoundCue::Stop => self.soundscape.stop(),
        };

        if let Err(err) = result {
            log_warn!("soundscape {:?} failed: {err}", cue);
        }
    }
}

fn display_id(id: Option<Uuid>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "-".into())
}
