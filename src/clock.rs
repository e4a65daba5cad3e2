//! Fixed-interval tick source for breathing sessions.
//!
//! The clock only counts time units. Ticks run on a tokio task; pausing keeps
//! the part of the interval that already elapsed so the next tick after
//! `resume()` lands `interval - carried` after the resume point.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::ClockError;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    /// Wall-clock time between ticks.
    pub period: Duration,
    /// Session seconds each tick stands for.
    pub unit_secs: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
            unit_secs: 1,
        }
    }
}

impl ClockConfig {
    /// One session second per tick, delivered `speed` times faster than real time.
    pub fn accelerated(speed: u32) -> Self {
        let speed = speed.max(1);
        Self {
            period: Duration::from_secs(1) / speed,
            unit_secs: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStatus {
    Stopped,
    Running,
    Paused,
    Cancelled,
}

/// A delivered tick. `epoch` identifies the run the tick was scheduled in;
/// pause, cancel and reset start a new epoch, so a tick that raced with one
/// of them fails [`SessionClock::accept`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTick {
    pub count: u64,
    pub epoch: u64,
}

pub type TickCallback = Arc<dyn Fn(ClockTick) + Send + Sync>;

struct Ticker {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

impl Ticker {
    fn stop(self) {
        self.cancel_token.cancel();
        self.handle.abort();
    }
}

struct ClockInner {
    status: ClockStatus,
    ticks: u64,
    epoch: u64,
    /// Start of the interval currently being timed.
    interval_started: Option<Instant>,
    /// Portion of the interrupted interval already elapsed at pause time.
    carried: Duration,
    /// The latest tick has fired but its consumer has not accepted it yet.
    undelivered: bool,
    ticker: Option<Ticker>,
}

impl ClockInner {
    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
    }
}

pub struct SessionClock {
    period: Duration,
    inner: Arc<Mutex<ClockInner>>,
    callback: TickCallback,
}

fn lock(inner: &Mutex<ClockInner>) -> MutexGuard<'_, ClockInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionClock {
    pub fn new<F>(period: Duration, on_tick: F) -> Self
    where
        F: Fn(ClockTick) + Send + Sync + 'static,
    {
        Self {
            period: period.max(Duration::from_millis(1)),
            inner: Arc::new(Mutex::new(ClockInner {
                status: ClockStatus::Stopped,
                ticks: 0,
                epoch: 0,
                interval_started: None,
                carried: Duration::ZERO,
                undelivered: false,
                ticker: None,
            })),
            callback: Arc::new(on_tick),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn status(&self) -> ClockStatus {
        lock(&self.inner).status
    }

    /// Ticks delivered since the last `start()`.
    pub fn ticks(&self) -> u64 {
        lock(&self.inner).ticks
    }

    /// True while the clock is running in `epoch`.
    pub fn is_current(&self, epoch: u64) -> bool {
        let inner = lock(&self.inner);
        inner.status == ClockStatus::Running && inner.epoch == epoch
    }

    /// Claims a delivered tick for its consumer. Returns false when pause,
    /// cancel or reset got to the clock first; a tick refused after a pause is
    /// delivered again on resume.
    ///
    /// Consumers that guard their own state with a lock should call this while
    /// holding it, under the same lock they hold when pausing.
    pub fn accept(&self, tick: ClockTick) -> bool {
        let mut inner = lock(&self.inner);
        if inner.status != ClockStatus::Running || inner.epoch != tick.epoch {
            return false;
        }
        inner.undelivered = false;
        true
    }

    /// Begins ticking. A running or paused clock is left untouched.
    pub fn start(&self) -> Result<(), ClockError> {
        let mut inner = lock(&self.inner);
        match inner.status {
            ClockStatus::Running | ClockStatus::Paused => return Ok(()),
            ClockStatus::Cancelled => return Err(ClockError::Cancelled),
            ClockStatus::Stopped => {}
        }

        inner.ticks = 0;
        inner.carried = Duration::ZERO;
        self.spawn_ticker(&mut inner, self.period)?;
        inner.status = ClockStatus::Running;
        log_debug!("clock started, period {:?}", self.period);
        Ok(())
    }

    pub fn pause(&self) {
        let mut inner = lock(&self.inner);
        if inner.status != ClockStatus::Running {
            return;
        }

        let now = Instant::now();
        inner.carried = if inner.undelivered {
            // The fired tick will be refused; hand it back on resume.
            inner.ticks = inner.ticks.saturating_sub(1);
            self.period
        } else {
            inner
                .interval_started
                .map(|started| now.saturating_duration_since(started).min(self.period))
                .unwrap_or(Duration::ZERO)
        };
        inner.undelivered = false;
        inner.status = ClockStatus::Paused;
        inner.epoch += 1;
        inner.stop_ticker();
        log_debug!("clock paused after {} ticks, carrying {:?}", inner.ticks, inner.carried);
    }

    pub fn resume(&self) -> Result<(), ClockError> {
        let mut inner = lock(&self.inner);
        match inner.status {
            ClockStatus::Paused => {}
            ClockStatus::Cancelled => return Err(ClockError::Cancelled),
            ClockStatus::Running | ClockStatus::Stopped => return Ok(()),
        }

        let first_delay = self.period.saturating_sub(inner.carried);
        self.spawn_ticker(&mut inner, first_delay)?;
        inner.status = ClockStatus::Running;
        log_debug!("clock resumed, next tick in {:?}", first_delay);
        Ok(())
    }

    /// Stops for good; `start`/`resume` fail until `reset`.
    pub fn cancel(&self) {
        let mut inner = lock(&self.inner);
        if inner.status == ClockStatus::Cancelled {
            return;
        }
        inner.status = ClockStatus::Cancelled;
        inner.epoch += 1;
        inner.undelivered = false;
        inner.stop_ticker();
        log_debug!("clock cancelled after {} ticks", inner.ticks);
    }

    /// Returns the clock to a fresh, stopped state.
    pub fn reset(&self) {
        let mut inner = lock(&self.inner);
        inner.stop_ticker();
        inner.status = ClockStatus::Stopped;
        inner.ticks = 0;
        inner.epoch += 1;
        inner.interval_started = None;
        inner.carried = Duration::ZERO;
        inner.undelivered = false;
    }

    fn spawn_ticker(&self, inner: &mut ClockInner, first_delay: Duration) -> Result<(), ClockError> {
        let runtime = Handle::try_current().map_err(|_| ClockError::Unavailable)?;

        inner.stop_ticker();
        inner.epoch += 1;
        inner.undelivered = false;
        let epoch = inner.epoch;
        let now = Instant::now();
        let already_elapsed = self.period.saturating_sub(first_delay);
        inner.interval_started = Some(now.checked_sub(already_elapsed).unwrap_or(now));

        let shared = Arc::clone(&self.inner);
        let callback = Arc::clone(&self.callback);
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let period = self.period;

        let handle = runtime.spawn(async move {
            let mut interval = time::interval_at(now + first_delay, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let fired_at = tokio::select! {
                    fired_at = interval.tick() => fired_at,
                    _ = token.cancelled() => break,
                };

                let tick = {
                    let mut inner = lock(&shared);
                    if inner.epoch != epoch || inner.status != ClockStatus::Running {
                        break;
                    }
                    inner.ticks += 1;
                    inner.interval_started = Some(fired_at);
                    inner.undelivered = true;
                    ClockTick {
                        count: inner.ticks,
                        epoch,
                    }
                };

                callback(tick);

                // Consumers that never call `accept` take delivery on return.
                let mut inner = lock(&shared);
                if inner.epoch != epoch {
                    break;
                }
                inner.undelivered = false;
            }
        });

        inner.ticker = Some(Ticker {
            handle,
            cancel_token,
        });
        Ok(())
    }
}

impl Drop for SessionClock {
    fn drop(&mut self) {
        lock(&self.inner).stop_ticker();
    }
}
