//! # Countdown Timers
//!
//! Per-player countdown table driven by the simulation tick.
//!
//! ## Design
//!
//! The original coroutine-per-timer approach is replaced with one table
//! polled once per frame: `tick(dt)` decrements every active countdown and
//! returns the ids that just expired. Cancellation is idempotent - cancelling
//! an id with no active timer is a no-op.

use std::collections::HashMap;

/// Per-id countdown timers.
///
/// Timers never go negative: a countdown is clamped to zero on the tick it
/// expires and removed from the table.
#[derive(Debug, Default)]
pub struct CountdownTimers {
    remaining: HashMap<String, f32>,
}

impl CountdownTimers {
    /// Creates an empty timer table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            remaining: HashMap::new(),
        }
    }

    /// Starts (or restarts) a countdown for `id`.
    pub fn start(&mut self, id: &str, duration_secs: f32) {
        self.remaining.insert(id.to_owned(), duration_secs.max(0.0));
    }

    /// Cancels the countdown for `id`. No-op if none is active.
    pub fn cancel(&mut self, id: &str) {
        self.remaining.remove(id);
    }

    /// Returns the seconds left on `id`'s countdown, or `None` if inactive.
    #[must_use]
    pub fn remaining(&self, id: &str) -> Option<f32> {
        self.remaining.get(id).copied()
    }

    /// Returns true if `id` has an active countdown.
    #[must_use]
    pub fn is_active(&self, id: &str) -> bool {
        self.remaining.contains_key(id)
    }

    /// Advances every countdown by the frame's elapsed time.
    ///
    /// Returns the ids whose countdowns reached zero this tick; those ids are
    /// removed from the table before returning.
    pub fn tick(&mut self, dt: f32) -> Vec<String> {
        let mut expired = Vec::new();

        for (id, left) in &mut self.remaining {
            *left = (*left - dt).max(0.0);
            if *left <= 0.0 {
                expired.push(id.clone());
            }
        }
        for id in &expired {
            self.remaining.remove(id);
        }

        expired
    }
}
