//! Time-window debounce for active-low mechanical contacts.
//!
//! One [`DebounceRecord`] per physical line.  A line that reads active is
//! accepted at most once per interval; the interval restarts at every
//! accepted transition, so a held switch repeats at the interval rate.
//!
//! Timestamps are `u64` milliseconds from a monotonic clock.  Subtraction
//! saturates, so a clock that steps backwards suppresses presses instead of
//! panicking.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceRecord {
    /// `None` until the first accepted transition.
    last_accepted_ms: Option<u64>,
    /// Line level seen on the previous sample.
    last_active: bool,
}

impl DebounceRecord {
    pub const fn new() -> Self {
        Self {
            last_accepted_ms: None,
            last_active: false,
        }
    }

    /// Level-triggered accept.
    ///
    /// Returns `true` (and records `now_ms`) when `active` and more than
    /// `interval_ms` has passed since the last accepted transition.
    pub fn accept(&mut self, now_ms: u64, active: bool, interval_ms: u64) -> bool {
        self.last_active = active;
        active && self.window_open(now_ms, interval_ms) && self.record(now_ms)
    }

    /// Edge-triggered accept: like [`accept`](Self::accept) but only on an
    /// inactive-to-active transition.
    pub fn accept_edge(&mut self, now_ms: u64, active: bool, interval_ms: u64) -> bool {
        let rising = active && !self.last_active;
        self.last_active = active;
        rising && self.window_open(now_ms, interval_ms) && self.record(now_ms)
    }

    pub fn last_accepted_ms(&self) -> Option<u64> {
        self.last_accepted_ms
    }

    fn window_open(&self, now_ms: u64, interval_ms: u64) -> bool {
        match self.last_accepted_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) > interval_ms,
        }
    }

    fn record(&mut self, now_ms: u64) -> bool {
        self.last_accepted_ms = Some(now_ms);
        true
    }
}
