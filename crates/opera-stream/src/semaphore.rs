// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Flow control for events in flight.
//!
//! The semaphore tracks two running totals. `received` counts events handed
//! over by peers and not yet released. `processing` counts the acquired share
//! and is capped by the configured maximum. Acquirers block on a condition
//! variable until their request fits, the deadline passes, or the semaphore is
//! terminated.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::metric::Metric;

/// Callback invoked on an unbalanced release with
/// `(received, processing, releasing)` as they were before the release.
pub type WarningFn = dyn Fn(Metric, Metric, Metric) + Send + Sync;

#[derive(Debug, Default)]
struct State {
    received: Metric,
    processing: Metric,
    max_processing: Metric,
    terminated: bool,
}

impl State {
    fn try_acquire(&mut self, metric: Metric) -> bool {
        if self.terminated {
            return false;
        }
        match self.processing.checked_add(metric) {
            Some(next) if next.fits_within(self.max_processing) => {
                self.processing = next;
                true
            }
            _ => false,
        }
    }
}

/// Counting semaphore over [`Metric`]s.
///
/// Share it between producers and consumers with an `Arc`.
pub struct EventsSemaphore {
    state: Mutex<State>,
    cond: Condvar,
    warning: Box<WarningFn>,
}

impl std::fmt::Debug for EventsSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventsSemaphore")
            .field("state", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl EventsSemaphore {
    /// Create a semaphore admitting at most `max_processing` at once.
    pub fn new<F>(max_processing: Metric, warning: F) -> Self
    where
        F: Fn(Metric, Metric, Metric) + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(State {
                max_processing,
                ..State::default()
            }),
            cond: Condvar::new(),
            warning: Box::new(warning),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record events handed over by a peer.
    pub fn received(&self, metric: Metric) {
        let mut state = self.lock();
        state.received = state.received.saturating_add(metric);
    }

    /// Block until `metric` fits under the cap, then take it.
    ///
    /// Returns `false` once `timeout` elapses or the semaphore is terminated.
    pub fn acquire(&self, metric: Metric, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock();
        loop {
            if state.try_acquire(metric) {
                return true;
            }
            if state.terminated {
                return false;
            }
            state = match deadline {
                Some(deadline) => {
                    let remaining = deadline
                        .checked_duration_since(Instant::now())
                        .filter(|left| !left.is_zero());
                    let Some(remaining) = remaining else {
                        debug!(?metric, processing = ?state.processing, "semaphore acquire timed out");
                        return false;
                    };
                    self.cond
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self.cond.wait(state).unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    /// Take `metric` if it fits right now.
    pub fn try_acquire(&self, metric: Metric) -> bool {
        self.lock().try_acquire(metric)
    }

    /// Give back `metric` from both totals and wake waiters.
    ///
    /// A total that would drop below zero is reset to zero and the imbalance
    /// is reported.
    pub fn release(&self, metric: Metric) {
        let mut state = self.lock();
        let before = (state.received, state.processing);
        let received = state.received.checked_sub(metric);
        let processing = state.processing.checked_sub(metric);
        state.received = received.unwrap_or_default();
        state.processing = processing.unwrap_or_default();
        drop(state);
        self.cond.notify_all();

        if received.is_none() || processing.is_none() {
            let (received, processing) = before;
            warn!(?received, ?processing, releasing = ?metric, "events semaphore underflow");
            (self.warning)(received, processing, metric);
        }
    }

    /// Fail all pending and future acquisitions.
    pub fn terminate(&self) {
        let mut state = self.lock();
        state.max_processing = Metric::default();
        state.terminated = true;
        drop(state);
        self.cond.notify_all();
    }

    /// Currently acquired total.
    pub fn processing(&self) -> Metric {
        self.lock().processing
    }

    /// Received and not yet released total.
    pub fn received_total(&self) -> Metric {
        self.lock().received
    }

    /// `true` after [`EventsSemaphore::terminate`].
    pub fn is_terminated(&self) -> bool {
        self.lock().terminated
    }
}
