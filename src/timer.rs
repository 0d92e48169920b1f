//! One-shot, re-armable countdown driven by an external clock.

use std::time::Duration;

use tokio::time::Instant;

/// Arm state of a [`OneShotTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerState {
    #[default]
    Unarmed,
    Armed { armed_at: Instant },
}

/// Fires once, `interval` after the most recent [`start`](OneShotTimer::start).
///
/// The timer never reads the clock itself; the owner passes `now` to both
/// `start` and `tick`. Arming an armed timer restarts the countdown, so a
/// burst of starts collapses into a single fire timed from the last one.
#[derive(Debug, Clone)]
pub struct OneShotTimer {
    interval: Duration,
    state: TimerState,
}

impl OneShotTimer {
    /// A zero interval is bumped to one millisecond.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            state: TimerState::Unarmed,
        }
    }

    /// Arm (or re-arm) the timer at `now`.
    pub fn start(&mut self, now: Instant) {
        self.state = TimerState::Armed { armed_at: now };
    }

    /// Advance the timer to `now`.
    ///
    /// Returns `true` exactly once per arm cycle, on the first tick strictly
    /// later than `interval` after arming; the timer is unarmed afterwards.
    pub fn tick(&mut self, now: Instant) -> bool {
        let TimerState::Armed { armed_at } = self.state else {
            return false;
        };
        if now.saturating_duration_since(armed_at) <= self.interval {
            return false;
        }
        self.state = TimerState::Unarmed;
        true
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, TimerState::Armed { .. })
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Point after which the next tick fires, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            TimerState::Armed { armed_at } => armed_at.checked_add(self.interval),
            TimerState::Unarmed => None,
        }
    }
}
