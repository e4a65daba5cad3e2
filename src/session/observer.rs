use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc;

use crate::error::SessionError;

use super::state::SessionSnapshot;

/// Subscriber to a session's lifecycle. All methods default to no-ops.
///
/// Callbacks run synchronously on the thread that caused the change. They may
/// issue controller commands; the resulting notifications are delivered after
/// the current callback returns.
pub trait SessionObserver: Send + Sync {
    /// Start, pause and resume.
    fn on_state_changed(&self, _snapshot: SessionSnapshot) {}
    fn on_progress(&self, _snapshot: SessionSnapshot) {}
    fn on_completed(&self, _snapshot: SessionSnapshot) {}
    fn on_cancelled(&self, _snapshot: SessionSnapshot) {}
    fn on_error(&self, _error: SessionError) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged(SessionSnapshot),
    Progress(SessionSnapshot),
    Completed(SessionSnapshot),
    Cancelled(SessionSnapshot),
    Error(SessionError),
}

impl SessionEvent {
    pub fn snapshot(&self) -> Option<&SessionSnapshot> {
        match self {
            SessionEvent::StateChanged(snapshot)
            | SessionEvent::Progress(snapshot)
            | SessionEvent::Completed(snapshot)
            | SessionEvent::Cancelled(snapshot) => Some(snapshot),
            SessionEvent::Error(_) => None,
        }
    }

    fn deliver(&self, observer: &dyn SessionObserver) {
        match self {
            SessionEvent::StateChanged(snapshot) => observer.on_state_changed(*snapshot),
            SessionEvent::Progress(snapshot) => observer.on_progress(*snapshot),
            SessionEvent::Completed(snapshot) => observer.on_completed(*snapshot),
            SessionEvent::Cancelled(snapshot) => observer.on_cancelled(*snapshot),
            SessionEvent::Error(error) => observer.on_error(error.clone()),
        }
    }
}

#[derive(Default)]
struct PendingEvents {
    queue: VecDeque<SessionEvent>,
    draining: bool,
}

/// Observer registry plus an ordered outbox.
///
/// Events are enqueued while the controller holds its state lock, so the
/// queue order is the transition order. Whichever caller finds the outbox idle
/// drains it; anyone enqueuing during a drain leaves delivery to the drainer.
#[derive(Default)]
pub(crate) struct Dispatcher {
    observers: Mutex<Vec<(u64, Arc<dyn SessionObserver>)>>,
    next_id: AtomicU64,
    pending: Mutex<PendingEvents>,
}

fn recover<'a, T>(guard: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>) -> MutexGuard<'a, T> {
    guard.unwrap_or_else(PoisonError::into_inner)
}

impl Dispatcher {
    pub(crate) fn subscribe(self: &Arc<Self>, observer: Arc<dyn SessionObserver>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        recover(self.observers.lock()).push((id, observer));
        Subscription {
            id,
            dispatcher: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) {
        recover(self.observers.lock()).retain(|(existing, _)| *existing != id);
    }

    pub(crate) fn observer_count(&self) -> usize {
        recover(self.observers.lock()).len()
    }

    pub(crate) fn enqueue<I>(&self, events: I)
    where
        I: IntoIterator<Item = SessionEvent>,
    {
        recover(self.pending.lock()).queue.extend(events);
    }

    pub(crate) fn drain(&self) {
        {
            let mut pending = recover(self.pending.lock());
            if pending.draining {
                return;
            }
            pending.draining = true;
        }

        loop {
            let event = {
                let mut pending = recover(self.pending.lock());
                match pending.queue.pop_front() {
                    Some(event) => event,
                    None => {
                        pending.draining = false;
                        return;
                    }
                }
            };

            let observers: Vec<Arc<dyn SessionObserver>> = recover(self.observers.lock())
                .iter()
                .map(|(_, observer)| Arc::clone(observer))
                .collect();
            for observer in &observers {
                event.deliver(observer.as_ref());
            }
        }
    }
}

/// Keeps an observer registered; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the observer"]
pub struct Subscription {
    id: u64,
    dispatcher: Weak<Dispatcher>,
}

impl Subscription {
    pub fn unsubscribe(self) {}

    /// Leaves the observer registered for the controller's lifetime.
    pub fn detach(mut self) {
        self.dispatcher = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.remove(self.id);
        }
    }
}

/// Forwards every event into an unbounded channel, for async consumers.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

impl SessionObserver for ChannelObserver {
    fn on_state_changed(&self, snapshot: SessionSnapshot) {
        self.forward(SessionEvent::StateChanged(snapshot));
    }

    fn on_progress(&self, snapshot: SessionSnapshot) {
        self.forward(SessionEvent::Progress(snapshot));
    }

    fn on_completed(&self, snapshot: SessionSnapshot) {
        self.forward(SessionEvent::Completed(snapshot));
    }

    fn on_cancelled(&self, snapshot: SessionSnapshot) {
        self.forward(SessionEvent::Cancelled(snapshot));
    }

    fn on_error(&self, error: SessionError) {
        self.forward(SessionEvent::Error(error));
    }
}
