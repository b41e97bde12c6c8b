//! Single-slot wakeup signal between the drivers and the coordinator.
//!
//! Carries no payload: the coordinator always re-reads the registry after
//! waking. Signals raised before the next consumption coalesce into one
//! wakeup, so a burst of results costs one resumption, not one per result.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tokio::time::Instant;

/// What ended an [`EventSignal::await_next`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// A signal arrived.
    Signal,
    /// The deadline elapsed before any signal.
    DeadlineElapsed,
    /// The signal was closed by teardown.
    Closed,
}

/// Latest-wins notification primitive.
///
/// Built on [`tokio::sync::Notify`], whose single stored permit gives the
/// "no queueing" semantics directly.
#[derive(Debug, Default)]
pub struct EventSignal {
    notify: Notify,
    closed: AtomicBool,
}

impl EventSignal {
    /// Create an open signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Never blocks; coalesces with any pending signal.
    pub fn signal(&self) {
        if !self.closed.load(Ordering::Acquire) {
            self.notify.notify_one();
        }
    }

    /// Suspend until a signal arrives, the deadline elapses, or the signal
    /// is closed.
    pub async fn await_next(&self, deadline: Instant) -> Wake {
        if self.closed.load(Ordering::Acquire) {
            return Wake::Closed;
        }

        match tokio::time::timeout_at(deadline, self.notify.notified()).await {
            Ok(()) => {
                if self.closed.load(Ordering::Acquire) {
                    Wake::Closed
                } else {
                    Wake::Signal
                }
            }
            Err(_) => Wake::DeadlineElapsed,
        }
    }

    /// Close the signal, waking any waiter. Idempotent.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Whether the signal has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
