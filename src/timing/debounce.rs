//! Trailing debounce with an injected clock
//!
//! Every [`trigger`](Debouncer::trigger) pushes the single deadline out to
//! `quiet` after that trigger. [`poll`](Debouncer::poll) reports the deadline
//! once it has passed, so a burst of triggers turns into one action fired a
//! quiet window after the last of them.

use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
    pending: usize,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
            pending: 0,
        }
    }

    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// (Re)arms the deadline relative to `now`
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
        self.pending += 1;
    }

    /// Returns `true` exactly once per burst, when the deadline has passed
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                debug!("Debounce fired after coalescing {} triggers", self.pending);
                self.deadline = None;
                self.pending = 0;
                true
            }
            _ => false,
        }
    }

    /// Drops a pending action without firing it
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.pending = 0;
    }

    /// Fires a pending action right away; `false` if nothing was armed
    pub fn flush(&mut self) -> bool {
        let armed = self.is_armed();
        self.cancel();
        armed
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left until the pending action fires
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}
